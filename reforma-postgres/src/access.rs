//! Access-restriction lookups against the reporting database. These back the
//! core filtering policy; any error here is a `FilterError` that the element
//! resolver downgrades to "no restriction applied".

use async_trait::async_trait;
use log::debug;

use reforma_core::access::{AccessLookup, FilterError};

use crate::Postgres;

const DISTRICT_PARENTS_SQL: &str =
    "select district_parent_id::bigint from report.v_district_parent where id::int4 = any($1)";

const TEACHER_CLASSES_SQL: &str = "select distinct g.class_unit_id::bigint \
     from group_teacher_assignments gta \
     inner join groups g on g.id = gta.group_id \
     where gta.teacher_id in (select profiles from report.mv_teacher_rsaa mtr where mtr.rsaa_id = $1)";

const TEACHER_PROFILES_SQL: &str =
    "select profiles::bigint from report.mv_teacher_rsaa mtr where mtr.rsaa_id = $1";

pub struct PgAccessLookup {
    db: Postgres,
}

impl PgAccessLookup {
    pub fn new(db: Postgres) -> Self {
        PgAccessLookup { db }
    }

    async fn query_ids(
        &self,
        sql: &str,
        param: &(dyn tokio_postgres::types::ToSql + Sync),
    ) -> Result<Vec<i64>, FilterError> {
        let client = self
            .db
            .connect()
            .await
            .map_err(|err| FilterError::Lookup(err.to_string()))?;

        let rows = client
            .query(sql, &[param])
            .await
            .map_err(|err| FilterError::Lookup(err.to_string()))?;

        rows.iter()
            .map(|row| row.try_get(0).map_err(|err| FilterError::Lookup(err.to_string())))
            .collect()
    }
}

#[async_trait]
impl AccessLookup for PgAccessLookup {
    async fn district_parents(&self, districts: &[i32]) -> Result<Vec<i64>, FilterError> {
        debug!("district parent lookup for {:?}", districts);
        self.query_ids(DISTRICT_PARENTS_SQL, &districts.to_vec()).await
    }

    async fn teacher_classes(&self, subject: &str) -> Result<Vec<i64>, FilterError> {
        debug!("class lookup for subject {}", subject);
        self.query_ids(TEACHER_CLASSES_SQL, &subject).await
    }

    async fn teacher_profiles(&self, subject: &str) -> Result<Vec<i64>, FilterError> {
        debug!("profile lookup for subject {}", subject);
        self.query_ids(TEACHER_PROFILES_SQL, &subject).await
    }
}
