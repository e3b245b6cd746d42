use std::collections::HashSet;

use super::{AccessPolicy, Error, Gate};

fn attr(name: &str) -> AccessPolicy {
    AccessPolicy::new(name)
}

fn set<'a>(attributes: &[&'a str]) -> HashSet<&'a str> {
    attributes.iter().copied().collect()
}

#[test]
fn test_parse_boolean_expressions() -> Result<(), Error> {
    assert_eq!(AccessPolicy::parse("att1")?, attr("att1"));
    assert_eq!(
        AccessPolicy::parse("(att1 and att2) or att3")?,
        (attr("att1") & attr("att2")) | attr("att3")
    );
    // `and` binds tighter than `or`
    assert_eq!(
        AccessPolicy::parse("att1 or att2 AND att3")?,
        attr("att1") | (attr("att2") & attr("att3"))
    );
    assert_eq!(
        AccessPolicy::parse(" ( att1 and (att2 or (att4 and att5)) ) or att3 ")?,
        (attr("att1") & (attr("att2") | (attr("att4") & attr("att5")))) | attr("att3")
    );
    Ok(())
}

#[test]
fn test_parse_threshold_gates() -> Result<(), Error> {
    assert_eq!(
        AccessPolicy::parse("2 of (att1, att2, att3)")?,
        AccessPolicy::threshold(2, vec![attr("att1"), attr("att2"), attr("att3")])?
    );
    assert_eq!(
        AccessPolicy::parse("2 of (att1, (att2 and att3), att4)")?,
        AccessPolicy::threshold(
            2,
            vec![attr("att1"), attr("att2") & attr("att3"), attr("att4")]
        )?
    );
    // a numeric attribute that is not followed by `of` is a plain attribute
    assert_eq!(AccessPolicy::parse("2 and b")?, attr("2") & attr("b"));
    Ok(())
}

#[test]
fn test_parse_errors() {
    assert_eq!(AccessPolicy::parse("  "), Err(Error::EmptyPolicy));
    assert!(matches!(
        AccessPolicy::parse("(att1 and att2"),
        Err(Error::UnexpectedEnd(_))
    ));
    assert!(matches!(
        AccessPolicy::parse("att1 and att2)"),
        Err(Error::UnexpectedToken { position: 13, .. })
    ));
    assert!(matches!(
        AccessPolicy::parse("att1 and or att2"),
        Err(Error::UnexpectedToken { .. })
    ));
    assert!(matches!(
        AccessPolicy::parse("att1 att2"),
        Err(Error::UnexpectedToken { .. })
    ));
    assert_eq!(
        AccessPolicy::parse("4 of (a, b, c)"),
        Err(Error::InvalidThreshold {
            threshold: 4,
            children: 3
        })
    );
    assert_eq!(
        AccessPolicy::parse("0 of (a, b)"),
        Err(Error::InvalidThreshold {
            threshold: 0,
            children: 2
        })
    );
    assert!(AccessPolicy::parse("1 of (a)").is_err());
}

#[test]
fn test_satisfiability() -> Result<(), Error> {
    let policy = AccessPolicy::parse("(att1 and att2) or att3")?;
    assert!(policy.is_satisfied_by(&set(&["att1", "att2"])));
    assert!(policy.is_satisfied_by(&set(&["att3"])));
    assert!(!policy.is_satisfied_by(&set(&["att1"])));
    assert!(!policy.is_satisfied_by(&set(&[])));

    let policy = AccessPolicy::parse("2 of (att1, (att2 and att3), att4)")?;
    assert!(!policy.is_satisfied_by(&set(&["att1", "att2"])));
    assert!(policy.is_satisfied_by(&set(&["att1", "att2", "att3"])));
    assert!(policy.is_satisfied_by(&set(&["att1", "att4"])));
    assert!(!policy.is_satisfied_by(&set(&["att2", "att3"])));
    Ok(())
}

#[test]
fn test_postfix() -> Result<(), Error> {
    assert_eq!(
        AccessPolicy::parse("(a and b) or c")?.to_postfix(),
        ["a", "b", "2of2", "c", "1of2"]
    );
    assert_eq!(
        AccessPolicy::parse("2 of (a, b or c, d)")?.to_postfix(),
        ["a", "b", "c", "1of2", "d", "2of3"]
    );
    Ok(())
}

#[test]
fn test_display_round_trip() -> Result<(), Error> {
    for expression in [
        "(att1 and att2) or att3",
        "att1 and (att2 or att3)",
        "2 of (att1, att2 and att3, att4 or att5)",
    ] {
        let policy = AccessPolicy::parse(expression)?;
        assert_eq!(AccessPolicy::parse(&policy.to_string())?, policy);
    }
    Ok(())
}

#[test]
fn test_gates_flatten_operator_chains() -> Result<(), Error> {
    let policy = AccessPolicy::parse("d and (a or b or c) and e")?;
    assert_eq!(
        policy.to_gates(),
        Gate::Node(
            3,
            vec![
                Gate::Leaf("d"),
                Gate::Node(1, vec![Gate::Leaf("a"), Gate::Leaf("b"), Gate::Leaf("c")]),
                Gate::Leaf("e"),
            ]
        )
    );
    assert!(policy.attributes() == ["d", "a", "b", "c", "e"]);
    assert!(!policy.has_threshold_gate());
    Ok(())
}
