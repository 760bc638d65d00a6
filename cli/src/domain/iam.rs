//! IAM policy document helpers shared by the constructs.

use ecsforge_common::Expr;

const POLICY_VERSION: &str = "2012-10-17";

/// One `Allow` statement.
pub(crate) fn allow(actions: &[&str], resources: Vec<Expr>) -> Expr {
    let action = match actions {
        [single] => Expr::from(*single),
        many => Expr::list(many.iter().copied()),
    };
    let resource = if resources.len() == 1 {
        resources.into_iter().next().unwrap_or(Expr::Null)
    } else {
        Expr::List(resources)
    };
    Expr::object([
        ("Action", action),
        ("Effect", "Allow".into()),
        ("Resource", resource),
    ])
}

pub(crate) fn document(statements: Vec<Expr>) -> Expr {
    Expr::object([
        ("Statement", Expr::List(statements)),
        ("Version", POLICY_VERSION.into()),
    ])
}

/// Trust policy letting `service` (e.g. `ecs-tasks.amazonaws.com`) assume a role.
pub(crate) fn assumed_by(service: &str, condition: Option<Expr>) -> Expr {
    let mut statement = vec![
        ("Action", Expr::from("sts:AssumeRole")),
        ("Effect", "Allow".into()),
        ("Principal", Expr::object([("Service", service.into())])),
    ];
    if let Some(condition) = condition {
        statement.push(("Condition", condition));
    }
    document(vec![Expr::object(statement)])
}

/// `Fn::Join` of `parts` with no delimiter.
pub(crate) fn join(parts: Vec<Expr>) -> Expr {
    Expr::Join(String::new(), parts)
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_allow_collapses_single_action_and_resource() {
        let s = allow(&["logs:PutLogEvents"], vec!["*".into()]);
        assert_eq!(s.get("Action"), Some(&Expr::from("logs:PutLogEvents")));
        assert_eq!(s.get("Resource"), Some(&Expr::from("*")));
    }

    #[test]
    fn test_allow_keeps_action_order() {
        let s = allow(&["s3:PutObject", "s3:GetObject"], vec!["a".into(), "b".into()]);
        let actions = s.get("Action").and_then(Expr::as_list).unwrap();
        assert_eq!(actions[0].as_str(), Some("s3:PutObject"));
        assert_eq!(s.get("Resource").and_then(Expr::as_list).unwrap().len(), 2);
    }

    #[test]
    fn test_assumed_by_names_the_service_principal() {
        let doc = assumed_by("firehose.amazonaws.com", None);
        let stmt = &doc.get("Statement").and_then(Expr::as_list).unwrap()[0];
        assert_eq!(
            stmt.pointer(&["Principal", "Service"]).and_then(Expr::as_str),
            Some("firehose.amazonaws.com")
        );
        assert!(stmt.get("Condition").is_none());
    }
}
