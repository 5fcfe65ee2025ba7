//! Report definition blobs live in `report.nav_object (code, object_meta)`;
//! this is the `MetadataStore` over that table. Put is update-only by
//! contract — pushing an unknown code is NotFound, not a create.

use async_trait::async_trait;

use reforma_core::metadata::MetadataStore;
use reforma_core::ReportError;

use crate::Postgres;

pub struct PgMetadataStore {
    db: Postgres,
}

impl PgMetadataStore {
    pub fn new(db: Postgres) -> Self {
        PgMetadataStore { db }
    }
}

#[async_trait]
impl MetadataStore for PgMetadataStore {
    async fn get(&self, code: &str) -> Result<Option<String>, ReportError> {
        let client = self.db.connect().await?;
        let row = client
            .query_opt(
                "select object_meta from report.nav_object where code = $1",
                &[&code],
            )
            .await
            .map_err(ReportError::upstream)?;

        row.map(|r| r.try_get(0).map_err(ReportError::upstream))
            .transpose()
    }

    async fn put(&self, code: &str, document: &str) -> Result<(), ReportError> {
        let client = self.db.connect().await?;
        let updated = client
            .execute(
                "update report.nav_object set object_meta = $2 where code = $1",
                &[&code, &document],
            )
            .await
            .map_err(ReportError::upstream)?;

        if updated == 0 {
            return Err(ReportError::NotFound(code.to_owned()));
        }
        Ok(())
    }
}
