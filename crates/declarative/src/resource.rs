//! Resource trait for declared resource graphs
//!
//! A Resource is one node of a desired-state graph: it has a stable
//! logical id, a type, a property document and the ids of the resources
//! it depends on.

use crate::types::RemovalPolicy;
use serde_json::Value;
use std::fmt;

/// Core trait for declared resources
///
/// Every node in a plan implements this trait, which provides:
/// - Identity (id, description, type)
/// - Desired properties
/// - Ordering edges (dependencies)
/// - Teardown behaviour
///
/// # Example
///
/// ```ignore
/// use declarative::Resource;
/// use serde_json::{json, Value};
///
/// #[derive(Debug)]
/// struct Bucket {
///     name: String,
/// }
///
/// impl Resource for Bucket {
///     fn id(&self) -> String {
///         "Bucket".to_string()
///     }
///
///     fn description(&self) -> String {
///         format!("Storage bucket {}", self.name)
///     }
///
///     fn resource_type(&self) -> &'static str {
///         "AWS::S3::Bucket"
///     }
///
///     fn properties(&self) -> Value {
///         json!({ "BucketName": self.name })
///     }
/// }
/// ```
pub trait Resource: Send + Sync + fmt::Debug {
    /// Logical identifier, unique within a plan
    ///
    /// This should be stable across runs with identical inputs. Examples:
    /// - "Database"
    /// - "TaskDefinition"
    /// - "DatabaseIngressFromService"
    fn id(&self) -> String;

    /// Human-readable description of what this resource is
    fn description(&self) -> String;

    /// Resource type, e.g. "AWS::RDS::DBInstance"
    ///
    /// Used for grouping and filtering.
    fn resource_type(&self) -> &'static str;

    /// Logical ids this resource references
    ///
    /// Every dependency must already be in the plan when this resource
    /// is added.
    fn dependencies(&self) -> Vec<String> {
        Vec::new()
    }

    /// Desired properties of the resource
    fn properties(&self) -> Value;

    /// Teardown behaviour, if the resource declares one
    fn removal_policy(&self) -> Option<RemovalPolicy> {
        None
    }
}

/// A boxed resource for type-erased storage
pub type BoxedResource = Box<dyn Resource>;

/// Extension trait for working with boxed resources
pub trait ResourceExt {
    /// Check if this resource's type matches a filter
    ///
    /// The filter is matched case-insensitively against the full type
    /// and against its last `::` segment, so both "AWS::ECS::Service"
    /// and "service" match an ECS service.
    fn matches_type(&self, filter: &str) -> bool;
}

impl<R: Resource + ?Sized> ResourceExt for R {
    fn matches_type(&self, filter: &str) -> bool {
        let full = self.resource_type().to_ascii_lowercase();
        let filter = filter.to_ascii_lowercase();
        if full == filter {
            return true;
        }
        full.rsplit("::")
            .next()
            .is_some_and(|short| short == filter || short.starts_with(&filter))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug)]
    struct Listener;

    impl Resource for Listener {
        fn id(&self) -> String {
            "Listener".into()
        }

        fn description(&self) -> String {
            "HTTPS listener".into()
        }

        fn resource_type(&self) -> &'static str {
            "AWS::ElasticLoadBalancingV2::Listener"
        }

        fn dependencies(&self) -> Vec<String> {
            vec!["LoadBalancer".into()]
        }

        fn properties(&self) -> Value {
            json!({ "Port": 443 })
        }
    }

    #[test]
    fn test_matches_type() {
        assert!(Listener.matches_type("AWS::ElasticLoadBalancingV2::Listener"));
        assert!(Listener.matches_type("listener"));
        assert!(Listener.matches_type("LIST"));
        assert!(!Listener.matches_type("service"));
    }

    #[test]
    fn test_default_removal_policy() {
        assert_eq!(Listener.removal_policy(), None);
    }
}
