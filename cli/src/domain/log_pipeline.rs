//! Log-delivery pipeline: destination bucket, delivery role and the Firehose
//! delivery stream that services' log routers write into.

use std::sync::LazyLock;

use ecsforge_common::{DeletionPolicy, Expr, Resource};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::domain::config::Removal;
use crate::domain::error::{CompositionError, ConfigError};
use crate::domain::handles::{FoundationId, LogPipelineHandle};
use crate::domain::iam;
use crate::domain::stack::Stack;

/// Token the delivery engine replaces with the failure category.
pub const ERROR_OUTPUT_TYPE_TOKEN: &str = "!{firehose:error-output-type}";

const DAILY_PREFIX: &str = "log/dt=!{timestamp:yyyy-MM-dd}/";
const DAILY_ERROR_PREFIX: &str =
    "error-log/dt=!{timestamp:yyyy-MM-dd}/!{firehose:error-output-type}";
const HOURLY_PREFIX: &str = "json-data/year=!{timestamp:yyyy}/month=!{timestamp:MM}/day=!{timestamp:dd}/hour=!{timestamp:HH}/";
const HOURLY_ERROR_PREFIX: &str = "error-json/year=!{timestamp:yyyy}/month=!{timestamp:MM}/day=!{timestamp:dd}/hour=!{timestamp:HH}/!{firehose:error-output-type}";

/// Retention values CloudWatch Logs accepts.
const RETENTION_DAYS: &[u32] = &[
    1, 3, 5, 7, 14, 30, 60, 90, 120, 150, 180, 365, 400, 545, 731, 1096, 1827, 2192, 2557, 2922,
    3288, 3653,
];

static STREAM_NAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::expect_used)]
    Regex::new(r"^[A-Za-z0-9_.-]{1,64}$").expect("valid regex")
});

/// Flush thresholds of the delivery stream. Whichever is reached first wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Buffering {
    /// 60..=900 seconds.
    pub interval_seconds: u32,
    /// 1..=128 MiB.
    pub size_mib: u32,
}

impl Default for Buffering {
    fn default() -> Self {
        Self {
            interval_seconds: 60,
            size_mib: 1,
        }
    }
}

impl Buffering {
    fn validate(self) -> Result<(), ConfigError> {
        if !(60..=900).contains(&self.interval_seconds) {
            return Err(ConfigError::invalid(
                "log_pipeline.buffering.interval_seconds",
                self.interval_seconds,
                "60..=900",
            ));
        }
        if !(1..=128).contains(&self.size_mib) {
            return Err(ConfigError::invalid(
                "log_pipeline.buffering.size_mib",
                self.size_mib,
                "1..=128",
            ));
        }
        Ok(())
    }

    fn to_expr(self) -> Expr {
        Expr::object([
            ("IntervalInSeconds", self.interval_seconds.into()),
            ("SizeInMBs", self.size_mib.into()),
        ])
    }
}

/// How delivered objects are partitioned by time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PartitionLayout {
    #[default]
    Daily,
    Hourly,
}

impl PartitionLayout {
    #[must_use]
    pub fn prefix(self) -> &'static str {
        match self {
            Self::Daily => DAILY_PREFIX,
            Self::Hourly => HOURLY_PREFIX,
        }
    }

    #[must_use]
    pub fn error_prefix(self) -> &'static str {
        match self {
            Self::Daily => DAILY_ERROR_PREFIX,
            Self::Hourly => HOURLY_ERROR_PREFIX,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Compression {
    #[default]
    Uncompressed,
    Gzip,
    Zip,
    Snappy,
}

impl Compression {
    #[must_use]
    pub fn format(self) -> &'static str {
        match self {
            Self::Uncompressed => "UNCOMPRESSED",
            Self::Gzip => "GZIP",
            Self::Zip => "ZIP",
            Self::Snappy => "Snappy",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LogPipelineConfig {
    pub stream_name: String,
    /// Physical bucket name; generated by CloudFormation when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bucket_name: Option<String>,
    pub buffering: Buffering,
    pub layout: PartitionLayout,
    pub compression: Compression,
    pub bucket_removal: Removal,
    /// Send delivery errors to a CloudWatch log group.
    pub delivery_logging: bool,
    pub log_retention_days: u32,
}

impl Default for LogPipelineConfig {
    fn default() -> Self {
        Self {
            stream_name: "ecs-firelens".to_string(),
            bucket_name: None,
            buffering: Buffering::default(),
            layout: PartitionLayout::Daily,
            compression: Compression::Uncompressed,
            bucket_removal: Removal::Delete,
            delivery_logging: true,
            log_retention_days: 731,
        }
    }
}

impl LogPipelineConfig {
    /// # Errors
    ///
    /// Returns an error for out-of-range thresholds, a malformed stream name,
    /// or a retention CloudWatch does not offer.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !STREAM_NAME_RE.is_match(&self.stream_name) {
            return Err(ConfigError::invalid(
                "log_pipeline.stream_name",
                &self.stream_name,
                "1-64 characters of [A-Za-z0-9_.-]",
            ));
        }
        self.buffering.validate()?;
        if !RETENTION_DAYS.contains(&self.log_retention_days) {
            let valid: Vec<String> = RETENTION_DAYS.iter().map(ToString::to_string).collect();
            return Err(ConfigError::invalid(
                "log_pipeline.log_retention_days",
                self.log_retention_days,
                valid.join(", "),
            ));
        }
        Ok(())
    }
}

/// Declare the pipeline in `stack` and return its handle.
pub(crate) fn build(
    stack: &mut Stack,
    config: &LogPipelineConfig,
    foundation: &FoundationId,
) -> Result<LogPipelineHandle, CompositionError> {
    config.validate()?;

    let mut bucket = Resource::new("AWS::S3::Bucket")
        .property(
            "BucketEncryption",
            Expr::object([(
                "ServerSideEncryptionConfiguration",
                Expr::List(vec![Expr::object([(
                    "ServerSideEncryptionByDefault",
                    Expr::object([("SSEAlgorithm", "AES256".into())]),
                )])]),
            )]),
        )
        .property(
            "PublicAccessBlockConfiguration",
            Expr::object([
                ("BlockPublicAcls", true.into()),
                ("BlockPublicPolicy", true.into()),
                ("IgnorePublicAcls", true.into()),
                ("RestrictPublicBuckets", true.into()),
            ]),
        )
        .removal_policy(config.bucket_removal.into());
    if let Some(name) = &config.bucket_name {
        bucket = bucket.property("BucketName", name.as_str());
    }
    let bucket = stack.add(&["LogBucket"], bucket)?;
    let bucket_arn = stack.attribute(&bucket, "Arn");

    let role = stack.add(
        &["firehoseRole"],
        Resource::new("AWS::IAM::Role").property(
            "AssumeRolePolicyDocument",
            iam::assumed_by(
                "firehose.amazonaws.com",
                Some(Expr::object([(
                    "StringEquals",
                    Expr::object([("sts:ExternalId", Expr::account_id())]),
                )])),
            ),
        ),
    )?;

    let mut statements = vec![iam::allow(
        &[
            "s3:AbortMultipartUpload",
            "s3:GetBucketLocation",
            "s3:GetObject",
            "s3:ListBucket",
            "s3:ListBucketMultipartUploads",
            "s3:PutObject",
        ],
        vec![
            bucket_arn.clone().into(),
            iam::join(vec![bucket_arn.clone().into(), "/*".into()]),
        ],
    )];

    let logging = if config.delivery_logging {
        let group = stack.add(
            &["FirehoseLogGroup"],
            Resource::new("AWS::Logs::LogGroup")
                .property("RetentionInDays", config.log_retention_days)
                .removal_policy(DeletionPolicy::Retain),
        )?;
        let log_stream = stack.add(
            &["FirehoseLogStream"],
            Resource::new("AWS::Logs::LogStream")
                .property("LogGroupName", stack.reference(&group))
                .property("LogStreamName", "S3Delivery")
                .removal_policy(DeletionPolicy::Retain),
        )?;
        statements.push(iam::allow(
            &["logs:PutLogEvents"],
            vec![stack.attribute(&group, "Arn").into()],
        ));
        Expr::object([
            ("Enabled", true.into()),
            ("LogGroupName", stack.reference(&group).into()),
            ("LogStreamName", stack.reference(&log_stream).into()),
        ])
    } else {
        Expr::object([("Enabled", false.into())])
    };

    let policy_name = stack.logical_id_for(&["firehoseRole", "DefaultPolicy"]);
    let policy = stack.add(
        &["firehoseRole", "DefaultPolicy"],
        Resource::new("AWS::IAM::Policy")
            .property("PolicyName", policy_name)
            .property("PolicyDocument", iam::document(statements))
            .property("Roles", Expr::List(vec![stack.reference(&role).into()])),
    )?;

    let layout = config.layout;
    let stream = stack.add(
        &["KinesisToS3"],
        Resource::new("AWS::KinesisFirehose::DeliveryStream")
            .property("DeliveryStreamName", config.stream_name.as_str())
            .property("DeliveryStreamType", "DirectPut")
            .property(
                "S3DestinationConfiguration",
                Expr::object([
                    ("BucketARN", bucket_arn.into()),
                    ("RoleARN", stack.attribute(&role, "Arn").into()),
                    ("BufferingHints", config.buffering.to_expr()),
                    ("CloudWatchLoggingOptions", logging),
                    ("CompressionFormat", config.compression.format().into()),
                    ("Prefix", layout.prefix().into()),
                    ("ErrorOutputPrefix", layout.error_prefix().into()),
                ]),
            )
            .depends_on(&policy),
    )?;

    tracing::debug!(
        stack = %stack.name(),
        stream = %config.stream_name,
        interval_seconds = config.buffering.interval_seconds,
        size_mib = config.buffering.size_mib,
        "log pipeline declared"
    );

    Ok(LogPipelineHandle::new(
        foundation.clone(),
        stack.reference(&stream),
        stack.attribute(&stream, "Arn"),
        config.buffering,
    ))
}
