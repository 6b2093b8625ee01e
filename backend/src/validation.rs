use std::{collections::HashMap, fmt};

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use common::model::{CellAttributes, CellInfo, CellType, LocationInformation};
use common::req::{AuthRequest, BoundingBoxQuery, FieldProjection, MeasurementQuery, NewMeasurement};
use serde_json::{Map, Value};

pub const SCHEMA_FIELD: &str = "_schema";

const MISSING: &str = "Missing data for required field.";
const UNEXPECTED: &str = "Received data for unexpected field.";
const NULL: &str = "Field may not be null.";
const INVALID_TYPE: &str = "Invalid input type.";
const NOT_A_STRING: &str = "Not a valid string.";
const NOT_A_NUMBER: &str = "Not a valid number.";
const NOT_AN_INTEGER: &str = "Not a valid integer.";
const NOT_A_BOOLEAN: &str = "Not a valid boolean.";
const NOT_A_DATETIME: &str = "Not a valid datetime.";
const NOT_A_LIST: &str = "Not a valid list.";
const NOT_A_MAPPING: &str = "Not a valid mapping type.";
const NOT_A_SCALAR: &str = "Not a scalar value.";
const NEGATIVE: &str = "Must be greater than or equal to 0.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: String,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors(Vec<FieldError>);

impl ValidationErrors {
    pub fn add(&mut self, field: impl Into<String>, reason: impl Into<String>) {
        self.0.push(FieldError {
            field: field.into(),
            reason: reason.into(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains_field(&self, field: &str) -> bool {
        self.0.iter().any(|e| e.field == field)
    }

    pub fn to_message(&self) -> Value {
        let mut message = Map::new();
        for err in &self.0 {
            if let Value::Array(reasons) = message
                .entry(err.field.clone())
                .or_insert_with(|| Value::Array(Vec::new()))
            {
                reasons.push(Value::String(err.reason.clone()));
            }
        }
        Value::Object(message)
    }

    fn into_result<T>(self, value: T) -> Result<T, Self> {
        if self.is_empty() {
            Ok(value)
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, err) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{}: {}", err.field, err.reason)?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}

// ===============================================
// field access
// ===============================================

struct Fields<'a> {
    object: &'a Map<String, Value>,
    prefix: String,
    declared: Vec<&'static str>,
}

impl<'a> Fields<'a> {
    fn new(object: &'a Map<String, Value>, path: &str) -> Self {
        let prefix = if path.is_empty() {
            String::new()
        } else {
            format!("{path}.")
        };
        Self {
            object,
            prefix,
            declared: Vec::new(),
        }
    }

    fn path(&self, name: &str) -> String {
        format!("{}{}", self.prefix, name)
    }

    // Null counts as absent for optional fields.
    fn value(
        &mut self,
        errors: &mut ValidationErrors,
        name: &'static str,
        required: bool,
    ) -> Option<&'a Value> {
        self.declared.push(name);
        match self.object.get(name) {
            None if required => {
                errors.add(self.path(name), MISSING);
                None
            }
            Some(Value::Null) if required => {
                errors.add(self.path(name), NULL);
                None
            }
            None | Some(Value::Null) => None,
            Some(value) => Some(value),
        }
    }

    fn parse<T>(
        &self,
        errors: &mut ValidationErrors,
        name: &str,
        value: &Value,
        parse: impl FnOnce(&Value) -> Result<T, String>,
    ) -> Option<T> {
        match parse(value) {
            Ok(v) => Some(v),
            Err(reason) => {
                errors.add(self.path(name), reason);
                None
            }
        }
    }

    fn required<T>(
        &mut self,
        errors: &mut ValidationErrors,
        name: &'static str,
        parse: impl FnOnce(&Value) -> Result<T, String>,
    ) -> Option<T> {
        let value = self.value(errors, name, true)?;
        self.parse(errors, name, value, parse)
    }

    fn optional<T>(
        &mut self,
        errors: &mut ValidationErrors,
        name: &'static str,
        parse: impl FnOnce(&Value) -> Result<T, String>,
    ) -> Option<T> {
        let value = self.value(errors, name, false)?;
        self.parse(errors, name, value, parse)
    }

    fn reject_unknown(self, errors: &mut ValidationErrors) {
        for key in self.object.keys() {
            if !self.declared.iter().any(|d| *d == key.as_str()) {
                errors.add(self.path(key), UNEXPECTED);
            }
        }
    }
}

fn object<'a>(
    value: &'a Value,
    path: &str,
    errors: &mut ValidationErrors,
) -> Option<&'a Map<String, Value>> {
    match value {
        Value::Object(obj) => Some(obj),
        _ => {
            let field = if path.is_empty() { SCHEMA_FIELD } else { path };
            errors.add(field, INVALID_TYPE);
            None
        }
    }
}

fn query_object(params: &HashMap<String, String>) -> Map<String, Value> {
    params
        .iter()
        .map(|(k, v)| (k.clone(), Value::String(v.clone())))
        .collect()
}

// ===============================================
// value parsers
// ===============================================

fn string(value: &Value) -> Result<String, String> {
    value
        .as_str()
        .map(str::to_owned)
        .ok_or_else(|| NOT_A_STRING.to_string())
}

fn number(value: &Value) -> Result<f64, String> {
    value
        .as_f64()
        .filter(|v| v.is_finite())
        .ok_or_else(|| NOT_A_NUMBER.to_string())
}

fn boolean(value: &Value) -> Result<bool, String> {
    value.as_bool().ok_or_else(|| NOT_A_BOOLEAN.to_string())
}

fn non_negative(value: i64) -> Result<u64, String> {
    u64::try_from(value).map_err(|_| NEGATIVE.to_string())
}

/// Accepts integral floats such as `3.0`.
fn non_negative_integer(value: &Value) -> Result<u64, String> {
    let int = match value {
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.fract() == 0.0 && f.abs() < i64::MAX as f64)
                .map(|f| f as i64)
        }),
        _ => None,
    };
    non_negative(int.ok_or_else(|| NOT_AN_INTEGER.to_string())?)
}

// RFC 3339, or ISO 8601 without offset which is taken as UTC.
fn parse_datetime(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|_| {
            NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
                .map(|naive| Utc.from_utc_datetime(&naive))
        })
        .ok()
}

fn datetime(value: &Value) -> Result<DateTime<Utc>, String> {
    value
        .as_str()
        .and_then(parse_datetime)
        .ok_or_else(|| NOT_A_DATETIME.to_string())
}

fn cell_type(value: &Value) -> Result<CellType, String> {
    value.as_str().and_then(|s| s.parse().ok()).ok_or_else(|| {
        let choices: Vec<&str> = CellType::ALL.iter().map(CellType::as_str).collect();
        format!("Must be one of: {}.", choices.join(", "))
    })
}

fn query_float(value: &Value) -> Result<f64, String> {
    value
        .as_str()
        .and_then(|s| s.trim().parse::<f64>().ok())
        .filter(|v| v.is_finite())
        .ok_or_else(|| NOT_A_NUMBER.to_string())
}

fn query_non_negative_float(value: &Value) -> Result<f64, String> {
    let v = query_float(value)?;
    if v < 0.0 {
        return Err(NEGATIVE.to_string());
    }
    Ok(v)
}

fn query_non_negative_integer(value: &Value) -> Result<u64, String> {
    let int = value
        .as_str()
        .and_then(|s| s.trim().parse::<i64>().ok())
        .ok_or_else(|| NOT_AN_INTEGER.to_string())?;
    non_negative(int)
}

fn projection(value: &Value) -> Result<FieldProjection, String> {
    string(value).map(|s| FieldProjection::parse(&s))
}

// ===============================================
// nested objects
// ===============================================

fn location_information(
    value: &Value,
    path: &str,
    errors: &mut ValidationErrors,
) -> Option<LocationInformation> {
    let obj = object(value, path, errors)?;
    let mut fields = Fields::new(obj, path);

    let latitude = fields.required(errors, "latitude", number);
    let longitude = fields.required(errors, "longitude", number);
    let accuracy = fields.required(errors, "accuracy", number);
    let altitude = fields.optional(errors, "altitude", number);
    let age = fields.required(errors, "age", non_negative_integer);
    fields.reject_unknown(errors);

    Some(LocationInformation {
        latitude: latitude?,
        longitude: longitude?,
        accuracy: accuracy?,
        altitude,
        age: age?,
    })
}

fn cell_attributes(
    value: &Value,
    path: &str,
    errors: &mut ValidationErrors,
) -> Option<CellAttributes> {
    let Value::Object(obj) = value else {
        errors.add(path, NOT_A_MAPPING);
        return None;
    };

    let mut attributes = CellAttributes::new();
    let mut valid = true;
    for (key, v) in obj {
        if v.is_array() || v.is_object() {
            errors.add(format!("{path}.{key}"), NOT_A_SCALAR);
            valid = false;
        } else {
            attributes.insert(key.clone(), v.clone());
        }
    }
    valid.then_some(attributes)
}

fn cell_info(value: &Value, path: &str, errors: &mut ValidationErrors) -> Option<CellInfo> {
    let obj = object(value, path, errors)?;
    let mut fields = Fields::new(obj, path);

    let active = fields.required(errors, "active", boolean);
    let cell_type = fields.required(errors, "type", cell_type);
    let cell_identity = fields
        .value(errors, "cell_identity", true)
        .and_then(|v| cell_attributes(v, &fields.path("cell_identity"), errors));
    let cell_signal_strength = fields
        .value(errors, "cell_signal_strength", true)
        .and_then(|v| cell_attributes(v, &fields.path("cell_signal_strength"), errors));
    fields.reject_unknown(errors);

    Some(CellInfo {
        active: active?,
        cell_type: cell_type?,
        cell_identity: cell_identity?,
        cell_signal_strength: cell_signal_strength?,
    })
}

fn cell_info_list(value: &Value, path: &str, errors: &mut ValidationErrors) -> Option<Vec<CellInfo>> {
    let Value::Array(items) = value else {
        errors.add(path, NOT_A_LIST);
        return None;
    };

    // every entry is checked so all errors get reported
    let cells: Vec<Option<CellInfo>> = items
        .iter()
        .enumerate()
        .map(|(i, item)| cell_info(item, &format!("{path}.{i}"), errors))
        .collect();
    cells.into_iter().collect()
}

// ===============================================
// request schemas
// ===============================================

pub fn auth_request(body: &Value) -> Result<AuthRequest, ValidationErrors> {
    let mut errors = ValidationErrors::default();
    let Some(obj) = object(body, "", &mut errors) else {
        return Err(errors);
    };
    let mut fields = Fields::new(obj, "");

    let imei = fields.required(&mut errors, "imei", string);
    let imsi = fields.required(&mut errors, "imsi", string);
    let readable_name = fields.required(&mut errors, "readable_name", string);
    let psk = fields.required(&mut errors, "psk", string);
    fields.reject_unknown(&mut errors);

    match (imei, imsi, readable_name, psk) {
        (Some(imei), Some(imsi), Some(readable_name), Some(psk)) => errors.into_result(AuthRequest {
            imei,
            imsi,
            readable_name,
            psk,
        }),
        _ => Err(errors),
    }
}

pub fn new_measurement(body: &Value) -> Result<NewMeasurement, ValidationErrors> {
    let mut errors = ValidationErrors::default();
    let Some(obj) = object(body, "", &mut errors) else {
        return Err(errors);
    };
    let mut fields = Fields::new(obj, "");

    let version = fields.required(&mut errors, "version", string);
    let source_id = fields.required(&mut errors, "source_id", string);
    let timestamp = fields.required(&mut errors, "timestamp", datetime);
    let location = fields
        .value(&mut errors, "location_information", false)
        .map(|v| location_information(v, "location_information", &mut errors));
    let battery = fields.required(&mut errors, "battery", number);
    let cells = fields
        .value(&mut errors, "cell_info", false)
        .map(|v| cell_info_list(v, "cell_info", &mut errors));
    fields.reject_unknown(&mut errors);

    match (version, source_id, timestamp, battery) {
        (Some(version), Some(source_id), Some(timestamp), Some(battery)) if errors.is_empty() => {
            Ok(NewMeasurement {
                version,
                source_id,
                timestamp,
                location_information: location.flatten(),
                battery,
                cell_info: cells.flatten().unwrap_or_default(),
            })
        }
        _ => Err(errors),
    }
}

pub fn measurement_query(params: &HashMap<String, String>) -> Result<MeasurementQuery, ValidationErrors> {
    let mut errors = ValidationErrors::default();
    let obj = query_object(params);
    let mut fields = Fields::new(&obj, "");

    let measurement_fields = fields.optional(&mut errors, "measurement_fields", projection);
    fields.reject_unknown(&mut errors);

    errors.into_result(MeasurementQuery { measurement_fields })
}

pub fn bounding_box_query(params: &HashMap<String, String>) -> Result<BoundingBoxQuery, ValidationErrors> {
    let mut errors = ValidationErrors::default();
    let obj = query_object(params);
    let mut fields = Fields::new(&obj, "");

    let latitude_upper_bound = fields.required(&mut errors, "latitude_upper_bound", query_float);
    let latitude_lower_bound = fields.required(&mut errors, "latitude_lower_bound", query_float);
    let longitude_lower_bound = fields.required(&mut errors, "longitude_lower_bound", query_float);
    let longitude_upper_bound = fields.required(&mut errors, "longitude_upper_bound", query_float);
    let min_location_age = fields.optional(&mut errors, "min_location_age", query_non_negative_integer);
    let max_location_age = fields.optional(&mut errors, "max_location_age", query_non_negative_integer);
    let min_location_accuracy =
        fields.optional(&mut errors, "min_location_accuracy", query_non_negative_float);
    let max_location_accuracy =
        fields.optional(&mut errors, "max_location_accuracy", query_non_negative_float);
    let measurement_fields = fields.optional(&mut errors, "measurement_fields", projection);
    fields.reject_unknown(&mut errors);

    let (
        Some(latitude_upper_bound),
        Some(latitude_lower_bound),
        Some(longitude_lower_bound),
        Some(longitude_upper_bound),
    ) = (
        latitude_upper_bound,
        latitude_lower_bound,
        longitude_lower_bound,
        longitude_upper_bound,
    )
    else {
        return Err(errors);
    };
    if !errors.is_empty() {
        return Err(errors);
    }

    let query = BoundingBoxQuery {
        latitude_lower_bound,
        latitude_upper_bound,
        longitude_lower_bound,
        longitude_upper_bound,
        min_location_age,
        max_location_age,
        min_location_accuracy,
        max_location_accuracy,
        measurement_fields,
    };
    check_bounds(&query, &mut errors);
    errors.into_result(query)
}

fn check_bounds(query: &BoundingBoxQuery, errors: &mut ValidationErrors) {
    if query.latitude_upper_bound < query.latitude_lower_bound {
        errors.add(
            SCHEMA_FIELD,
            "latitude_upper_bound must be greater than latitude_lower_bound.",
        );
    }
    if query.longitude_lower_bound > query.longitude_upper_bound {
        errors.add(
            SCHEMA_FIELD,
            "longitude_lower_bound must be smaller than longitude_upper_bound.",
        );
    }
    if let (Some(min), Some(max)) = (query.min_location_age, query.max_location_age) {
        if min > max {
            errors.add(SCHEMA_FIELD, "min_location_age must be smaller than max_location_age.");
        }
    }
    if let (Some(min), Some(max)) = (query.min_location_accuracy, query.max_location_accuracy) {
        if min > max {
            errors.add(
                SCHEMA_FIELD,
                "min_location_accuracy must be smaller than max_location_accuracy.",
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn auth_body() -> Value {
        json!({
            "imei": "356938035643809",
            "imsi": "310150123456789",
            "readable_name": "test phone",
            "psk": "defaultpsk",
        })
    }

    fn measurement_body() -> Value {
        json!({
            "version": "2",
            "source_id": "5c7a9f1e2b",
            "timestamp": "2019-03-01T12:30:00Z",
            "location_information": {
                "latitude": 52.52,
                "longitude": 13.405,
                "accuracy": 14.0,
                "altitude": 34.5,
                "age": 1500,
            },
            "battery": 0.87,
            "cell_info": [{
                "active": true,
                "type": "LTE",
                "cell_identity": {"ci": 27447553, "tac": 1234, "mcc": "262"},
                "cell_signal_strength": {"rsrp": -97, "rsrq": -10.5, "valid": true},
            }],
        })
    }

    fn params(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn bbox_params() -> Vec<(&'static str, &'static str)> {
        vec![
            ("latitude_upper_bound", "25"),
            ("latitude_lower_bound", "15"),
            ("longitude_lower_bound", "-10"),
            ("longitude_upper_bound", "10.5"),
        ]
    }

    #[test]
    fn auth_accepts_complete_body() {
        let req = auth_request(&auth_body()).unwrap();
        assert_eq!(req.imei, "356938035643809");
        assert_eq!(req.psk, "defaultpsk");
    }

    #[test]
    fn auth_missing_psk_names_psk() {
        let mut body = auth_body();
        body.as_object_mut().unwrap().remove("psk");

        let errors = auth_request(&body).unwrap_err();
        assert!(errors.contains_field("psk"));
        assert_eq!(errors.to_message(), json!({"psk": [MISSING]}));
    }

    #[test]
    fn auth_wrong_type_psk_names_psk() {
        let mut body = auth_body();
        body["psk"] = json!(1234);

        let errors = auth_request(&body).unwrap_err();
        assert!(errors.contains_field("psk"));
    }

    #[test]
    fn auth_rejects_unknown_field() {
        let mut body = auth_body();
        body["firmware"] = json!("1.0");

        let errors = auth_request(&body).unwrap_err();
        assert!(!errors.contains_field("psk"));
        assert_eq!(errors.to_message(), json!({"firmware": [UNEXPECTED]}));
    }

    #[test]
    fn body_must_be_object() {
        let errors = auth_request(&json!(["imei"])).unwrap_err();
        assert_eq!(errors.to_message(), json!({"_schema": [INVALID_TYPE]}));

        let errors = new_measurement(&json!("text")).unwrap_err();
        assert!(errors.contains_field(SCHEMA_FIELD));
    }

    #[test]
    fn measurement_accepts_complete_body() {
        let mes = new_measurement(&measurement_body()).unwrap();

        assert_eq!(mes.version, "2");
        assert_eq!(mes.timestamp.to_rfc3339(), "2019-03-01T12:30:00+00:00");
        let loc = mes.location_information.unwrap();
        assert_eq!(loc.age, 1500);
        assert_eq!(loc.altitude, Some(34.5));
        assert_eq!(mes.cell_info.len(), 1);
        assert_eq!(mes.cell_info[0].cell_type, CellType::Lte);
        assert_eq!(mes.cell_info[0].cell_identity["mcc"], json!("262"));
    }

    #[test]
    fn measurement_optional_parts_may_be_absent() {
        let mut body = measurement_body();
        let obj = body.as_object_mut().unwrap();
        obj.remove("location_information");
        obj.remove("cell_info");

        let mes = new_measurement(&body).unwrap();
        assert!(mes.location_information.is_none());
        assert!(mes.cell_info.is_empty());
    }

    #[test]
    fn measurement_missing_battery_names_battery() {
        let mut body = measurement_body();
        body.as_object_mut().unwrap().remove("battery");

        let errors = new_measurement(&body).unwrap_err();
        assert_eq!(errors.to_message(), json!({"battery": [MISSING]}));
    }

    #[test]
    fn measurement_rejects_unknown_top_level_field() {
        let mut body = measurement_body();
        body["frequency"] = json!("800");

        let errors = new_measurement(&body).unwrap_err();
        assert_eq!(errors.to_message(), json!({"frequency": [UNEXPECTED]}));
    }

    #[test]
    fn measurement_rejects_unknown_nested_fields() {
        let mut body = measurement_body();
        body["location_information"]["speed"] = json!(3.2);
        body["cell_info"][0]["frequency"] = json!("800");

        let errors = new_measurement(&body).unwrap_err();
        assert!(errors.contains_field("location_information.speed"));
        assert!(errors.contains_field("cell_info.0.frequency"));
    }

    #[test]
    fn measurement_nested_type_errors_carry_paths() {
        let mut body = measurement_body();
        body["location_information"]["age"] = json!(-5);
        body["location_information"].as_object_mut().unwrap().remove("latitude");
        body["cell_info"][0]["type"] = json!("WIMAX");
        body["cell_info"][0]["cell_signal_strength"] = json!({"rsrp": [1, 2]});

        let errors = new_measurement(&body).unwrap_err();
        let message = errors.to_message();
        assert_eq!(message["location_information.age"], json!([NEGATIVE]));
        assert_eq!(message["location_information.latitude"], json!([MISSING]));
        assert_eq!(
            message["cell_info.0.type"],
            json!(["Must be one of: LTE, UMTS, CDMA, GSM."])
        );
        assert_eq!(
            message["cell_info.0.cell_signal_strength.rsrp"],
            json!([NOT_A_SCALAR])
        );
    }

    #[test]
    fn measurement_type_errors() {
        let mut body = measurement_body();
        body["battery"] = json!("full");
        body["timestamp"] = json!("yesterday");
        body["cell_info"] = json!({"active": true});

        let message = new_measurement(&body).unwrap_err().to_message();
        assert_eq!(message["battery"], json!([NOT_A_NUMBER]));
        assert_eq!(message["timestamp"], json!([NOT_A_DATETIME]));
        assert_eq!(message["cell_info"], json!([NOT_A_LIST]));
    }

    #[test]
    fn measurement_null_required_field() {
        let mut body = measurement_body();
        body["source_id"] = Value::Null;

        let message = new_measurement(&body).unwrap_err().to_message();
        assert_eq!(message, json!({"source_id": [NULL]}));
    }

    #[test]
    fn naive_timestamp_is_utc() {
        let mut body = measurement_body();
        body["timestamp"] = json!("2019-03-01T12:30:00.250");

        let mes = new_measurement(&body).unwrap();
        assert_eq!(
            mes.timestamp,
            "2019-03-01T12:30:00.250Z".parse::<DateTime<Utc>>().unwrap()
        );
    }

    #[test]
    fn integral_float_age_is_accepted() {
        let mut body = measurement_body();
        body["location_information"]["age"] = json!(12.0);
        assert_eq!(new_measurement(&body).unwrap().location_information.unwrap().age, 12);

        body["location_information"]["age"] = json!(12.5);
        let message = new_measurement(&body).unwrap_err().to_message();
        assert_eq!(message["location_information.age"], json!([NOT_AN_INTEGER]));
    }

    #[test]
    fn measurement_query_projection() {
        let q = measurement_query(&params(&[("measurement_fields", "battery,timestamp")])).unwrap();
        assert_eq!(
            q.measurement_fields,
            Some(FieldProjection(vec!["battery".into(), "timestamp".into()]))
        );

        assert_eq!(measurement_query(&params(&[])).unwrap(), MeasurementQuery::default());

        let errors = measurement_query(&params(&[("fields", "battery")])).unwrap_err();
        assert!(errors.contains_field("fields"));
    }

    #[test]
    fn bounding_box_parses() {
        let mut p = bbox_params();
        p.push(("min_location_age", "10"));
        p.push(("max_location_accuracy", "25.5"));
        p.push(("measurement_fields", "battery"));

        let q = bounding_box_query(&params(&p)).unwrap();
        assert_eq!(q.latitude_lower_bound, 15.0);
        assert_eq!(q.longitude_upper_bound, 10.5);
        assert_eq!(q.min_location_age, Some(10));
        assert_eq!(q.max_location_age, None);
        assert_eq!(q.max_location_accuracy, Some(25.5));
        assert!(q.measurement_fields.is_some());
    }

    #[test]
    fn bounding_box_requires_all_bounds() {
        let errors = bounding_box_query(&params(&[("latitude_upper_bound", "1")])).unwrap_err();
        let message = errors.to_message();

        assert_eq!(message["latitude_lower_bound"], json!([MISSING]));
        assert_eq!(message["longitude_lower_bound"], json!([MISSING]));
        assert_eq!(message["longitude_upper_bound"], json!([MISSING]));
        assert!(!errors.contains_field("latitude_upper_bound"));
    }

    #[test]
    fn bounding_box_latitude_order() {
        let mut p = bbox_params();
        p[0] = ("latitude_upper_bound", "10");

        let errors = bounding_box_query(&params(&p)).unwrap_err();
        assert_eq!(
            errors.to_message(),
            json!({"_schema": ["latitude_upper_bound must be greater than latitude_lower_bound."]})
        );
    }

    #[test]
    fn bounding_box_longitude_order() {
        let mut p = bbox_params();
        p[2] = ("longitude_lower_bound", "20");

        let errors = bounding_box_query(&params(&p)).unwrap_err();
        assert_eq!(
            errors.to_message()[SCHEMA_FIELD],
            json!(["longitude_lower_bound must be smaller than longitude_upper_bound."])
        );
    }

    #[test]
    fn bounding_box_age_and_accuracy_order() {
        let mut p = bbox_params();
        p.push(("min_location_age", "100"));
        p.push(("max_location_age", "10"));
        p.push(("min_location_accuracy", "5"));
        p.push(("max_location_accuracy", "1"));

        let errors = bounding_box_query(&params(&p)).unwrap_err();
        assert_eq!(
            errors.to_message()[SCHEMA_FIELD],
            json!([
                "min_location_age must be smaller than max_location_age.",
                "min_location_accuracy must be smaller than max_location_accuracy."
            ])
        );
    }

    #[test]
    fn bounding_box_equal_bounds_are_fine() {
        let mut p = bbox_params();
        p[0] = ("latitude_upper_bound", "15");
        p.push(("min_location_age", "10"));
        p.push(("max_location_age", "10"));

        assert!(bounding_box_query(&params(&p)).is_ok());
    }

    #[test]
    fn bounding_box_rejects_negative_and_malformed_filters() {
        let mut p = bbox_params();
        p.push(("min_location_age", "-1"));
        p.push(("max_location_age", "1.5"));
        p.push(("min_location_accuracy", "-0.1"));
        p[1] = ("latitude_lower_bound", "north");

        let message = bounding_box_query(&params(&p)).unwrap_err().to_message();
        assert_eq!(message["min_location_age"], json!([NEGATIVE]));
        assert_eq!(message["max_location_age"], json!([NOT_AN_INTEGER]));
        assert_eq!(message["min_location_accuracy"], json!([NEGATIVE]));
        assert_eq!(message["latitude_lower_bound"], json!([NOT_A_NUMBER]));
        assert!(!errors_mention_schema(&message));
    }

    fn errors_mention_schema(message: &Value) -> bool {
        message.get(SCHEMA_FIELD).is_some()
    }

    #[test]
    fn bounding_box_rejects_unknown_parameter() {
        let mut p = bbox_params();
        p.push(("limit", "10"));

        let errors = bounding_box_query(&params(&p)).unwrap_err();
        assert_eq!(errors.to_message(), json!({"limit": [UNEXPECTED]}));
    }

    #[test]
    fn display_lists_fields() {
        let mut errors = ValidationErrors::default();
        errors.add("imei", MISSING);
        errors.add("psk", NULL);

        assert_eq!(
            errors.to_string(),
            "imei: Missing data for required field.; psk: Field may not be null."
        );
    }
}
