use async_trait::async_trait;
use aws_sdk_athena::types::{Column, TableMetadata};
use infracheck_core::{LookupError, LookupRequest, ResourceCategory, ResourceDescription};
use infracheck_provider::{ResourceFetcher, unsupported_resource_type};
use serde_json::{Value, json};
use tracing::{debug, instrument};

use crate::auth::build_sdk_config;
use crate::config::AwsBaseConfig;
use crate::error::{AwsFetchError, sdk_error};
use crate::json::{require_key, require_param};

const CATEGORY: ResourceCategory = ResourceCategory::Athena;

/// Catalog used when the request has no `catalog` parameter.
pub const DEFAULT_CATALOG: &str = "AwsDataCatalog";

/// Describes Athena databases and tables.
///
/// `database` is keyed by database name. `table` is keyed by table name and
/// needs a `database` parameter.
pub struct AthenaFetcher {
    client: aws_sdk_athena::Client,
}

impl AthenaFetcher {
    pub async fn new(config: &AwsBaseConfig) -> Self {
        let sdk_config = build_sdk_config(config).await;
        Self::from_sdk_config(&sdk_config)
    }

    pub fn from_sdk_config(sdk_config: &aws_config::SdkConfig) -> Self {
        Self::with_client(aws_sdk_athena::Client::new(sdk_config))
    }

    /// Create a fetcher around a pre-built client (for testing).
    pub fn with_client(client: aws_sdk_athena::Client) -> Self {
        Self { client }
    }

    async fn describe(&self, request: &LookupRequest) -> Result<Value, AwsFetchError> {
        let catalog = request.get_param("catalog").unwrap_or(DEFAULT_CATALOG);

        match request.resource_type.as_str() {
            "database" => {
                let database = require_key(request, "a database name")?;
                debug!(catalog, database, "describing Athena database");
                let output = self
                    .client
                    .get_database()
                    .catalog_name(catalog)
                    .database_name(database)
                    .send()
                    .await
                    .map_err(|e| sdk_error(CATEGORY, "get_database", &e))?;
                let db = output
                    .database()
                    .ok_or_else(|| AwsFetchError::Empty(format!("database {database}")))?;
                Ok(json!({
                    "Database": {
                        "Name": db.name(),
                        "Description": db.description(),
                        "Parameters": db.parameters(),
                    }
                }))
            }
            "table" => {
                let table = require_key(request, "a table name")?;
                let database = require_param(request, "database")?;
                debug!(catalog, database, table, "describing Athena table");
                let output = self
                    .client
                    .get_table_metadata()
                    .catalog_name(catalog)
                    .database_name(database)
                    .table_name(table)
                    .send()
                    .await
                    .map_err(|e| sdk_error(CATEGORY, "get_table_metadata", &e))?;
                let metadata = output
                    .table_metadata()
                    .ok_or_else(|| AwsFetchError::Empty(format!("table {database}.{table}")))?;
                Ok(json!({ "TableMetadata": table_json(metadata) }))
            }
            _ => Err(AwsFetchError::InvalidInput(
                unsupported_resource_type(request).message,
            )),
        }
    }
}

#[async_trait]
impl ResourceFetcher for AthenaFetcher {
    fn category(&self) -> ResourceCategory {
        CATEGORY
    }

    fn supported_resource_types(&self) -> Vec<String> {
        vec!["database".to_owned(), "table".to_owned()]
    }

    #[instrument(skip_all, fields(resource_type = %request.resource_type, key = %request.key))]
    async fn fetch(&self, request: &LookupRequest) -> Result<ResourceDescription, LookupError> {
        Ok(ResourceDescription::new(self.describe(request).await?))
    }
}

fn column_json(column: &Column) -> Value {
    json!({
        "Name": column.name(),
        "Type": column.r#type(),
        "Comment": column.comment(),
    })
}

fn table_json(table: &TableMetadata) -> Value {
    json!({
        "Name": table.name(),
        "TableType": table.table_type(),
        "Columns": table.columns().iter().map(column_json).collect::<Vec<_>>(),
        "PartitionKeys": table.partition_keys().iter().map(column_json).collect::<Vec<_>>(),
        "Parameters": table.parameters(),
    })
}
