use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use actix_web::{
    body::MessageBody,
    dev::{ServiceFactory, ServiceRequest, ServiceResponse},
    get,
    http::StatusCode,
    middleware::Logger,
    post,
    web::{self, Data},
    App, Error, HttpRequest, HttpResponse, HttpServer,
};
use anyhow::anyhow;
use common::{
    model::Measurement,
    req::{AuthResponse, FieldProjection, MeasurementResponse, MeasurementsResponse, StatusResponse},
};
use serde_json::Value;

use crate::{
    config::Config,
    db::{Db, Registration},
    error::{ApiError, ApiResult},
    validation,
};

pub type SharedDb = Arc<Mutex<Db>>;

/// Shared secret devices present to `/auth`.
#[derive(Debug, Clone)]
struct AuthPsk(String);

#[derive(Clone)]
pub struct AppState {
    pub db: SharedDb,
    pub auth_psk: String,
    pub api_root: String,
}

/// Runs `f` against the database on the blocking thread pool.
async fn with_db<T, F>(db: Data<SharedDb>, f: F) -> ApiResult<T>
where
    F: FnOnce(&mut Db) -> anyhow::Result<T> + Send + 'static,
    T: Send + 'static,
{
    let res = web::block(move || {
        let mut db = db
            .lock()
            .map_err(|_| anyhow!("database connection poisoned"))?;
        f(&mut *db)
    })
    .await
    .map_err(|e| anyhow!("database task failed: {e}"))?;

    Ok(res?)
}

fn render(mes: &Measurement, projection: Option<&FieldProjection>) -> ApiResult<Value> {
    let value = serde_json::to_value(mes).map_err(anyhow::Error::from)?;
    Ok(match projection {
        Some(projection) => projection.apply(value),
        None => value,
    })
}

#[post("/auth")]
async fn api_auth(
    body: web::Json<Value>,
    psk: Data<AuthPsk>,
    db: Data<SharedDb>,
) -> ApiResult<HttpResponse> {
    let (source, provided_psk) = validation::auth_request(&body)
        .map_err(ApiError::auth_validation)?
        .into_source();

    if provided_psk != psk.0 {
        log::info!("rejected registration of imei {}: wrong psk", source.imei);
        return Err(ApiError::Forbidden("No or wrong PSK provided.".to_string()));
    }

    let (status, source_id) = match with_db(db, move |db| db.register_source(&source)).await? {
        Registration::Created(id) => {
            log::info!("registered new source {id}");
            (StatusCode::CREATED, id)
        }
        Registration::Existing(id) => {
            log::debug!("source {id} authenticated again");
            (StatusCode::OK, id)
        }
    };

    Ok(HttpResponse::build(status).json(AuthResponse {
        status: status.as_u16(),
        source_id,
    }))
}

#[post("/measurements")]
async fn api_create_measurement(
    body: web::Json<Value>,
    db: Data<SharedDb>,
) -> ApiResult<HttpResponse> {
    let mes = validation::new_measurement(&body)?;

    let id = with_db(db, move |db| db.insert_measurement(&mes)).await?;
    log::debug!("stored measurement {id}");

    Ok(HttpResponse::Created().json(StatusResponse {
        status: StatusCode::CREATED.as_u16(),
    }))
}

#[get("/measurement/{measurement_id}")]
async fn api_measurement(
    path: web::Path<String>,
    query: web::Query<HashMap<String, String>>,
    db: Data<SharedDb>,
) -> ApiResult<HttpResponse> {
    let query = validation::measurement_query(&query)?;
    let measurement_id = path.into_inner();

    let id = measurement_id.clone();
    let mes = with_db(db, move |db| db.measurement(&id))
        .await?
        .ok_or_else(|| {
            ApiError::NotFound(format!(
                "Measurement with id {measurement_id} was not found."
            ))
        })?;

    Ok(HttpResponse::Ok().json(MeasurementResponse {
        status: StatusCode::OK.as_u16(),
        result: render(&mes, query.measurement_fields.as_ref())?,
    }))
}

#[get("/measurements")]
async fn api_measurements(
    query: web::Query<HashMap<String, String>>,
    db: Data<SharedDb>,
) -> ApiResult<HttpResponse> {
    let query = validation::bounding_box_query(&query)?;
    let projection = query.measurement_fields.clone();

    let found = with_db(db, move |db| db.measurements_in_box(&query)).await?;
    let results = found
        .iter()
        .map(|mes| render(mes, projection.as_ref()))
        .collect::<ApiResult<Vec<_>>>()?;

    Ok(HttpResponse::Ok().json(MeasurementsResponse {
        status: StatusCode::OK.as_u16(),
        len: results.len(),
        results,
    }))
}

async fn not_found(req: HttpRequest) -> ApiResult<HttpResponse> {
    Err(ApiError::NotFound(format!(
        "No route for {} {}",
        req.method(),
        req.path()
    )))
}

fn routes(cfg: &mut web::ServiceConfig) {
    cfg.service(api_auth)
        .service(api_create_measurement)
        .service(api_measurement)
        .service(api_measurements);
}

pub fn app(
    state: AppState,
) -> App<
    impl ServiceFactory<
        ServiceRequest,
        Config = (),
        Response = ServiceResponse<impl MessageBody>,
        Error = Error,
        InitError = (),
    >,
> {
    let json_config = web::JsonConfig::default()
        .error_handler(|err, _req| ApiError::BadRequest(err.to_string()).into());
    let query_config = web::QueryConfig::default()
        .error_handler(|err, _req| ApiError::BadRequest(err.to_string()).into());

    App::new()
        .app_data(Data::new(state.db))
        .app_data(Data::new(AuthPsk(state.auth_psk)))
        .app_data(json_config)
        .app_data(query_config)
        .service(web::scope(&state.api_root).configure(routes))
        .default_service(web::to(not_found))
        .wrap(Logger::default())
}

pub async fn new_http_server(db: SharedDb, config: &Config) -> std::io::Result<()> {
    let state = AppState {
        db,
        auth_psk: config.auth_psk.clone(),
        api_root: config.api_root.clone(),
    };

    log::info!(
        "listening on {}:{} (api root '{}')",
        config.bind_address,
        config.port,
        config.api_root
    );

    HttpServer::new(move || app(state.clone()))
        .bind((config.bind_address.as_str(), config.port))?
        .run()
        .await
}
