use std::path::PathBuf;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use super::record::{ExecutionStrategy, JobRecord, JobSource, SchemaMode};
use crate::error::ValidationError;

static RE_IDENTIFIER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z][A-Za-z0-9_]*$").unwrap());

/// A caller's request to process one file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobRequest {
    pub owner: String,
    pub source: JobSource,
    /// Destination in `dataset.table` form.
    pub target_table: String,
    #[serde(default)]
    pub schema_mode: SchemaMode,
}

impl JobRequest {
    /// Request for a file on the local machine.
    pub fn local_file(
        owner: &str,
        path: impl Into<PathBuf>,
        size_bytes: u64,
        target_table: &str,
    ) -> Self {
        let path = path.into();
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        Self {
            owner: owner.to_string(),
            source: JobSource::LocalFile {
                file_name,
                size_bytes,
                path,
            },
            target_table: target_table.to_string(),
            schema_mode: SchemaMode::AutoDetect,
        }
    }

    /// Request for an object already in the stage.
    pub fn remote_reference(owner: &str, bucket: &str, path: &str, target_table: &str) -> Self {
        Self {
            owner: owner.to_string(),
            source: JobSource::RemoteReference {
                bucket: bucket.to_string(),
                path: path.to_string(),
            },
            target_table: target_table.to_string(),
            schema_mode: SchemaMode::AutoDetect,
        }
    }

    pub fn with_schema(mut self, schema_mode: SchemaMode) -> Self {
        self.schema_mode = schema_mode;
        self
    }

    /// Checks the request without touching the network.
    ///
    /// Returns the `(dataset, table)` pair split from `target_table`.
    pub fn validate(&self) -> Result<(String, String), ValidationError> {
        if self.owner.trim().is_empty() {
            return Err(ValidationError::EmptyOwner);
        }

        let (dataset, table) = parse_target_table(&self.target_table)?;

        match &self.source {
            JobSource::LocalFile {
                file_name,
                size_bytes,
                ..
            } => {
                if file_name.trim().is_empty() || *size_bytes == 0 {
                    return Err(ValidationError::EmptyFile);
                }
            }
            JobSource::RemoteReference { bucket, path } => {
                if bucket.trim().is_empty() || path.trim().trim_matches('/').is_empty() {
                    return Err(ValidationError::MissingRemoteReference);
                }
            }
        }

        if let SchemaMode::Explicit(fields) = &self.schema_mode {
            if fields.is_empty() {
                return Err(ValidationError::EmptySchema);
            }
            for field in fields {
                check_identifier("column", &field.name)?;
            }
        }

        Ok((dataset, table))
    }

    /// Validates and builds the queued record for this request.
    pub fn into_record(self, strategy: ExecutionStrategy) -> Result<JobRecord, ValidationError> {
        let (dataset, table) = self.validate()?;
        Ok(JobRecord::queued(
            self.owner,
            self.source,
            dataset,
            table,
            self.schema_mode,
            strategy,
        ))
    }
}

/// Splits `dataset.table`, checking both halves.
pub fn parse_target_table(target: &str) -> Result<(String, String), ValidationError> {
    let target = target.trim();
    if target.is_empty() {
        return Err(ValidationError::MissingTargetTable);
    }
    if target.matches('.').count() != 1 {
        return Err(ValidationError::MalformedTargetTable(target.to_string()));
    }
    let (dataset, table) = target
        .split_once('.')
        .ok_or_else(|| ValidationError::MalformedTargetTable(target.to_string()))?;
    check_identifier("dataset", dataset)?;
    check_identifier("table", table)?;
    Ok((dataset.to_string(), table.to_string()))
}

fn check_identifier(kind: &'static str, value: &str) -> Result<(), ValidationError> {
    if RE_IDENTIFIER.is_match(value) {
        Ok(())
    } else {
        Err(ValidationError::InvalidIdentifier {
            kind,
            value: value.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::record::SchemaField;

    #[test]
    fn test_parse_target_table() {
        assert_eq!(
            parse_target_table("geo.parcels").unwrap(),
            ("geo".to_string(), "parcels".to_string())
        );
        assert_eq!(
            parse_target_table("  Geo_2024.roads_v2 ").unwrap(),
            ("Geo_2024".to_string(), "roads_v2".to_string())
        );
    }

    #[test]
    fn test_target_table_without_dot() {
        assert_eq!(
            parse_target_table("parcels"),
            Err(ValidationError::MalformedTargetTable("parcels".to_string()))
        );
    }

    #[test]
    fn test_target_table_with_two_dots() {
        assert!(matches!(
            parse_target_table("proj.geo.parcels"),
            Err(ValidationError::MalformedTargetTable(_))
        ));
    }

    #[test]
    fn test_empty_target_table() {
        assert_eq!(parse_target_table(""), Err(ValidationError::MissingTargetTable));
    }

    #[test]
    fn test_invalid_identifiers() {
        assert!(matches!(
            parse_target_table("1geo.parcels"),
            Err(ValidationError::InvalidIdentifier { kind: "dataset", .. })
        ));
        assert!(matches!(
            parse_target_table("geo.par-cels"),
            Err(ValidationError::InvalidIdentifier { kind: "table", .. })
        ));
        assert!(matches!(
            parse_target_table("geo."),
            Err(ValidationError::InvalidIdentifier { kind: "table", .. })
        ));
    }

    #[test]
    fn test_local_file_must_be_non_empty() {
        let request = JobRequest::local_file("alice", "/tmp/parcels.zip", 0, "geo.parcels");
        assert_eq!(request.validate(), Err(ValidationError::EmptyFile));

        let request = JobRequest::local_file("alice", "/", 10, "geo.parcels");
        assert_eq!(request.validate(), Err(ValidationError::EmptyFile));
    }

    #[test]
    fn test_remote_reference_needs_bucket_and_path() {
        let request = JobRequest::remote_reference("alice", "", "a.zip", "geo.parcels");
        assert_eq!(request.validate(), Err(ValidationError::MissingRemoteReference));

        let request = JobRequest::remote_reference("alice", "bucket", " ", "geo.parcels");
        assert_eq!(request.validate(), Err(ValidationError::MissingRemoteReference));

        let request = JobRequest::remote_reference("alice", "bucket", "a.zip", "geo.parcels");
        assert!(request.validate().is_ok());
    }

    #[test]
    fn test_explicit_schema_validation() {
        let request = JobRequest::local_file("alice", "/tmp/p.zip", 10, "geo.parcels")
            .with_schema(SchemaMode::Explicit(vec![]));
        assert_eq!(request.validate(), Err(ValidationError::EmptySchema));

        let request = JobRequest::local_file("alice", "/tmp/p.zip", 10, "geo.parcels")
            .with_schema(SchemaMode::Explicit(vec![SchemaField::new("bad name", "STRING")]));
        assert!(matches!(
            request.validate(),
            Err(ValidationError::InvalidIdentifier { kind: "column", .. })
        ));
    }

    #[test]
    fn test_empty_owner_rejected() {
        let request = JobRequest::local_file(" ", "/tmp/p.zip", 10, "geo.parcels");
        assert_eq!(request.validate(), Err(ValidationError::EmptyOwner));
    }

    #[test]
    fn test_into_record_splits_target() {
        let record = JobRequest::local_file("alice", "/tmp/parcels.zip", 10, "geo.parcels")
            .into_record(ExecutionStrategy::Simulated)
            .unwrap();
        assert_eq!(record.target_dataset, "geo");
        assert_eq!(record.target_table, "parcels");
        assert_eq!(record.strategy, ExecutionStrategy::Simulated);
    }
}
