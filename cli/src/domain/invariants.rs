//! Topology checks over a synthesized assembly.
//!
//! These look only at the rendered templates, so they hold no matter which
//! code path produced the resources.

use std::collections::BTreeSet;
use std::fmt;

use ecsforge_common::{DeletionPolicy, Expr, Resource, Template};
use serde::Serialize;

use crate::domain::assembly::Assembly;
use crate::domain::handles::Color;
use crate::domain::log_pipeline::ERROR_OUTPUT_TYPE_TOKEN;

const CLUSTER: &str = "AWS::ECS::Cluster";
const REPOSITORY: &str = "AWS::ECR::Repository";
const DELIVERY_STREAM: &str = "AWS::KinesisFirehose::DeliveryStream";
const TARGET_GROUP: &str = "AWS::ElasticLoadBalancingV2::TargetGroup";
const LISTENER: &str = "AWS::ElasticLoadBalancingV2::Listener";

/// A broken rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Violation {
    pub rule: &'static str,
    /// Stack the violation was found in; empty for assembly-wide rules.
    pub stack: String,
    pub detail: String,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.stack.is_empty() {
            write!(f, "[{}] {}", self.rule, self.detail)
        } else {
            write!(f, "[{}] {}: {}", self.rule, self.stack, self.detail)
        }
    }
}

/// What the configuration asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Expectations {
    /// Color behind the production listener.
    pub live: Color,
    /// Policy of the delivery destination bucket.
    pub log_bucket: DeletionPolicy,
}

impl Default for Expectations {
    fn default() -> Self {
        Self {
            live: Color::Blue,
            log_bucket: DeletionPolicy::Delete,
        }
    }
}

/// Check `assembly` against the default expectations.
#[must_use]
pub fn verify(assembly: &Assembly) -> Vec<Violation> {
    verify_with(assembly, &Expectations::default())
}

#[must_use]
pub fn verify_with(assembly: &Assembly, expected: &Expectations) -> Vec<Violation> {
    let mut out = Vec::new();
    exactly_one(assembly, CLUSTER, "single-cluster", &mut out);
    exactly_one(assembly, REPOSITORY, "single-repository", &mut out);
    exactly_one(assembly, DELIVERY_STREAM, "single-delivery-stream", &mut out);

    for stack in assembly.stacks() {
        let mut v = |rule: &'static str, detail: String| {
            out.push(Violation {
                rule,
                stack: stack.name.clone(),
                detail,
            });
        };
        check_delivery_streams(&stack.template, expected, &mut v);
        check_retention(&stack.template, &mut v);
        check_blue_green(&stack.template, expected.live, &mut v);
    }

    check_imports(assembly, &mut out);
    out
}

fn exactly_one(assembly: &Assembly, ty: &str, rule: &'static str, out: &mut Vec<Violation>) {
    let count: usize = assembly
        .stacks()
        .iter()
        .map(|s| s.template.resources_of_type(ty).count())
        .sum();
    if count != 1 {
        out.push(Violation {
            rule,
            stack: String::new(),
            detail: format!("expected exactly one {ty}, found {count}"),
        });
    }
}

fn check_delivery_streams(
    template: &Template,
    expected: &Expectations,
    v: &mut impl FnMut(&'static str, String),
) {
    for (id, stream) in template.resources_of_type(DELIVERY_STREAM) {
        let dest = |key: &str| stream.pointer(&["S3DestinationConfiguration", key]);

        let hints = dest("BufferingHints");
        for key in ["IntervalInSeconds", "SizeInMBs"] {
            if hints.and_then(|h| h.get(key)).and_then(Expr::as_i64).is_none() {
                v("buffering-hints", format!("{id} has no BufferingHints.{key}"));
            }
        }

        let prefix = dest("Prefix").and_then(Expr::as_str).unwrap_or_default();
        if !prefix.contains("!{timestamp:") {
            v("partitioned-prefix", format!("{id} prefix '{prefix}' is not time-partitioned"));
        }
        let error_prefix = dest("ErrorOutputPrefix").and_then(Expr::as_str).unwrap_or_default();
        if !error_prefix.contains(ERROR_OUTPUT_TYPE_TOKEN) {
            v(
                "partitioned-prefix",
                format!("{id} error prefix '{error_prefix}' lacks {ERROR_OUTPUT_TYPE_TOKEN}"),
            );
        }

        match dest("RoleARN") {
            Some(Expr::GetAtt(role, attr))
                if attr == "Arn" && is_type(template, role, "AWS::IAM::Role") => {}
            other => v(
                "delivery-role-arn",
                format!("{id} RoleARN must be the Arn of an IAM role, found {other:?}"),
            ),
        }

        if let Some(Expr::GetAtt(bucket, _)) = dest("BucketARN") {
            let policy = template.resources.get(bucket).and_then(|b| b.deletion_policy);
            if policy != Some(expected.log_bucket) {
                v(
                    "log-bucket-removal",
                    format!(
                        "log bucket {bucket} has DeletionPolicy {policy:?}, expected {:?}",
                        expected.log_bucket
                    ),
                );
            }
        }
    }
}

fn is_type(template: &Template, id: &str, ty: &str) -> bool {
    template.resources.get(id).is_some_and(|r| r.resource_type == ty)
}

fn check_retention(template: &Template, v: &mut impl FnMut(&'static str, String)) {
    for ty in ["AWS::S3::Bucket", "AWS::Logs::LogGroup", REPOSITORY] {
        for (id, resource) in template.resources_of_type(ty) {
            if resource.deletion_policy.is_none() {
                v("explicit-deletion-policy", format!("{ty} {id} has no DeletionPolicy"));
            }
        }
    }
}

fn check_blue_green(template: &Template, live: Color, v: &mut impl FnMut(&'static str, String)) {
    let group = |color: Color| {
        let suffix = format!("-{color}");
        template.resources_of_type(TARGET_GROUP).find(|(_, r)| {
            r.get("Name")
                .and_then(Expr::as_str)
                .is_some_and(|n| n.ends_with(&suffix))
        })
    };
    let (Some((blue_id, blue)), Some((green_id, green))) = (group(Color::Blue), group(Color::Green))
    else {
        return;
    };

    if without_name(blue) != without_name(green) {
        v(
            "target-group-parity",
            format!("{blue_id} and {green_id} differ in more than their Name"),
        );
    }

    let id_of = |color: Color| if color == Color::Blue { blue_id } else { green_id };
    for (role, color) in [("ProductionListener", live), ("TestListener", live.other())] {
        let listeners: Vec<_> = template
            .resources_of_type(LISTENER)
            .filter(|(id, _)| id.starts_with(&format!("bluegreen{role}")))
            .collect();
        let [(listener_id, listener)] = listeners.as_slice() else {
            v("listener-binding", format!("expected one {role}, found {}", listeners.len()));
            continue;
        };
        let targets: Vec<&Expr> = listener
            .get("DefaultActions")
            .and_then(Expr::as_list)
            .unwrap_or_default()
            .iter()
            .filter_map(|a| a.get("TargetGroupArn"))
            .collect();
        let expected = Expr::Ref(id_of(color).to_string());
        if targets != [&expected] {
            v(
                "listener-binding",
                format!("{listener_id} must forward only to the {color} target group"),
            );
        }
    }
}

fn without_name(resource: &Resource) -> Resource {
    let mut copy = resource.clone();
    copy.properties.remove("Name");
    copy
}

fn check_imports(assembly: &Assembly, out: &mut Vec<Violation>) {
    let exports: BTreeSet<&str> = assembly
        .stacks()
        .iter()
        .flat_map(|s| s.template.outputs.values())
        .filter_map(|o| o.export.as_ref().map(|e| e.name.as_str()))
        .collect();
    let cluster_stack = assembly
        .stacks()
        .iter()
        .find(|s| s.template.resources_of_type(CLUSTER).next().is_some())
        .map(|s| s.name.as_str());

    for stack in assembly.stacks() {
        let mut imports = Vec::new();
        for resource in stack.template.resources.values() {
            for value in resource.properties.values() {
                collect_imports(value, &mut imports);
            }
        }
        for output in stack.template.outputs.values() {
            collect_imports(&output.value, &mut imports);
        }

        for name in imports {
            if !exports.contains(name) {
                out.push(Violation {
                    rule: "import-has-export",
                    stack: stack.name.clone(),
                    detail: format!("imports '{name}', which no stack exports"),
                });
            }
            let producer = name.split_once(':').map(|(p, _)| p);
            if cluster_stack.is_some() && producer != cluster_stack {
                out.push(Violation {
                    rule: "single-foundation",
                    stack: stack.name.clone(),
                    detail: format!("imports '{name}' from outside the foundation stack"),
                });
            }
        }
    }
}

fn collect_imports<'a>(value: &'a Expr, out: &mut Vec<&'a str>) {
    match value {
        Expr::ImportValue(name) => out.push(name),
        Expr::List(items) | Expr::Join(_, items) => {
            for item in items {
                collect_imports(item, out);
            }
        }
        Expr::Object(map) => {
            for item in map.values() {
                collect_imports(item, out);
            }
        }
        Expr::Select(_, inner) => collect_imports(inner, out),
        _ => {}
    }
}
