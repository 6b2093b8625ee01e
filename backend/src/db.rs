use crate::schema::*;
use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use common::model::{LocationInformation, Measurement, Source};
use common::req::{BoundingBoxQuery, NewMeasurement, NewSource};
use diesel::connection::SimpleConnection;
use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;

const CREATE_TABLES: &str = "
CREATE TABLE IF NOT EXISTS sources (
    id TEXT PRIMARY KEY NOT NULL,
    imei TEXT NOT NULL,
    imsi TEXT NOT NULL,
    readable_name TEXT NOT NULL
);
CREATE UNIQUE INDEX IF NOT EXISTS sources_imei_imsi ON sources (imei, imsi);

CREATE TABLE IF NOT EXISTS measurements (
    seq INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL,
    id TEXT NOT NULL UNIQUE,
    version TEXT NOT NULL,
    source_id TEXT NOT NULL,
    timestamp TEXT NOT NULL,
    latitude DOUBLE,
    longitude DOUBLE,
    accuracy DOUBLE,
    altitude DOUBLE,
    age BIGINT,
    battery DOUBLE NOT NULL,
    cell_info TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS measurements_location ON measurements (latitude, longitude);
";

#[derive(Debug, Insertable, Queryable)]
#[diesel(table_name=sources)]
struct SourceRow {
    id: String,
    imei: String,
    imsi: String,
    readable_name: String,
}

impl From<SourceRow> for Source {
    fn from(row: SourceRow) -> Self {
        Self {
            id: row.id,
            imei: row.imei,
            imsi: row.imsi,
            readable_name: row.readable_name,
        }
    }
}

#[derive(Debug, Insertable)]
#[diesel(table_name=measurements)]
struct NewMeasurementRow {
    id: String,
    version: String,
    source_id: String,
    timestamp: String, // RFC 3339, UTC, nanosecond precision
    latitude: Option<f64>,
    longitude: Option<f64>,
    accuracy: Option<f64>, // m
    altitude: Option<f64>, // m
    age: Option<i64>,      // ms
    battery: f64,
    cell_info: String, // json array
}

#[derive(Debug, Queryable)]
struct MeasurementRow {
    #[allow(unused)]
    seq: i64, // insertion order
    id: String,
    version: String,
    source_id: String,
    timestamp: String,
    latitude: Option<f64>,
    longitude: Option<f64>,
    accuracy: Option<f64>,
    altitude: Option<f64>,
    age: Option<i64>,
    battery: f64,
    cell_info: String,
}

/// Fixed width so the text column sorts chronologically.
fn timestamp_column(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

impl NewMeasurementRow {
    fn new(id: String, mes: &NewMeasurement) -> Result<Self> {
        let loc = mes.location_information.as_ref();
        let age = loc
            .map(|l| i64::try_from(l.age))
            .transpose()
            .context("location age out of range")?;

        Ok(Self {
            id,
            version: mes.version.clone(),
            source_id: mes.source_id.clone(),
            timestamp: timestamp_column(&mes.timestamp),
            latitude: loc.map(|l| l.latitude),
            longitude: loc.map(|l| l.longitude),
            accuracy: loc.map(|l| l.accuracy),
            altitude: loc.and_then(|l| l.altitude),
            age,
            battery: mes.battery,
            cell_info: serde_json::to_string(&mes.cell_info)?,
        })
    }
}

impl TryFrom<MeasurementRow> for Measurement {
    type Error = anyhow::Error;

    fn try_from(row: MeasurementRow) -> Result<Self> {
        let location_information = match (row.latitude, row.longitude, row.accuracy, row.age) {
            (Some(latitude), Some(longitude), Some(accuracy), Some(age)) => {
                Some(LocationInformation {
                    latitude,
                    longitude,
                    accuracy,
                    altitude: row.altitude,
                    age: u64::try_from(age).context("negative location age in database")?,
                })
            }
            _ => None,
        };

        Ok(Self {
            timestamp: DateTime::parse_from_rfc3339(&row.timestamp)
                .with_context(|| format!("bad timestamp for measurement {}", row.id))?
                .with_timezone(&Utc),
            cell_info: serde_json::from_str(&row.cell_info)
                .with_context(|| format!("bad cell_info for measurement {}", row.id))?,
            id: row.id,
            version: row.version,
            source_id: row.source_id,
            location_information,
            battery: row.battery,
        })
    }
}

/// Outcome of a device registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Registration {
    Created(String),
    Existing(String),
}

fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

pub struct Db {
    conn: SqliteConnection,
}

impl Db {
    pub fn connect(database_url: &str) -> Result<Self> {
        let mut conn = SqliteConnection::establish(database_url)
            .with_context(|| format!("could not open database {database_url}"))?;
        conn.batch_execute(CREATE_TABLES)
            .context("could not create tables")?;

        Ok(Self { conn })
    }

    /// Creates the source for an unseen (imei, imsi) pair, otherwise renames the existing one.
    /// Lookup and write share one immediate transaction.
    pub fn register_source(&mut self, new: &NewSource) -> Result<Registration> {
        self.conn.immediate_transaction::<_, anyhow::Error, _>(|conn| {
            let existing = sources::table
                .filter(sources::imei.eq(new.imei.as_str()))
                .filter(sources::imsi.eq(new.imsi.as_str()))
                .select(sources::id)
                .first::<String>(conn)
                .optional()?;

            match existing {
                Some(id) => {
                    diesel::update(sources::table.find(id.as_str()))
                        .set(sources::readable_name.eq(new.readable_name.as_str()))
                        .execute(conn)?;
                    Ok(Registration::Existing(id))
                }
                None => {
                    let row = SourceRow {
                        id: new_id(),
                        imei: new.imei.clone(),
                        imsi: new.imsi.clone(),
                        readable_name: new.readable_name.clone(),
                    };
                    diesel::insert_into(sources::table)
                        .values(&row)
                        .execute(conn)?;
                    Ok(Registration::Created(row.id))
                }
            }
        })
    }

    #[allow(unused)]
    pub fn find_source(&mut self, source_id: &str) -> Result<Option<Source>> {
        let row = sources::table
            .find(source_id)
            .first::<SourceRow>(&mut self.conn)
            .optional()?;

        Ok(row.map(Source::from))
    }

    pub fn insert_measurement(&mut self, mes: &NewMeasurement) -> Result<String> {
        let row = NewMeasurementRow::new(new_id(), mes)?;

        diesel::insert_into(measurements::table)
            .values(&row)
            .execute(&mut self.conn)?;

        Ok(row.id)
    }

    pub fn measurement(&mut self, measurement_id: &str) -> Result<Option<Measurement>> {
        measurements::table
            .filter(measurements::id.eq(measurement_id))
            .first::<MeasurementRow>(&mut self.conn)
            .optional()?
            .map(Measurement::try_from)
            .transpose()
    }

    /// Measurements whose location lies inside the box and matches every optional bound.
    /// Measurements without location information never match.
    pub fn measurements_in_box(&mut self, query: &BoundingBoxQuery) -> Result<Vec<Measurement>> {
        let mut select = measurements::table
            .filter(
                measurements::latitude
                    .between(query.latitude_lower_bound, query.latitude_upper_bound),
            )
            .filter(
                measurements::longitude
                    .between(query.longitude_lower_bound, query.longitude_upper_bound),
            )
            .order((measurements::timestamp.asc(), measurements::seq.asc()))
            .into_boxed();

        if let Some(min_age) = query.min_location_age {
            select = select.filter(measurements::age.ge(clamp_age(min_age)));
        }
        if let Some(max_age) = query.max_location_age {
            select = select.filter(measurements::age.le(clamp_age(max_age)));
        }
        if let Some(min_accuracy) = query.min_location_accuracy {
            select = select.filter(measurements::accuracy.ge(min_accuracy));
        }
        if let Some(max_accuracy) = query.max_location_accuracy {
            select = select.filter(measurements::accuracy.le(max_accuracy));
        }

        select
            .load::<MeasurementRow>(&mut self.conn)?
            .into_iter()
            .map(Measurement::try_from)
            .collect()
    }
}

fn clamp_age(age: u64) -> i64 {
    i64::try_from(age).unwrap_or(i64::MAX)
}
