use std::sync::Arc;

use axum::{
    Router,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::{
    RouteCastError,
    map_view::{InMemoryMap, MarkerKind, Popup},
    models::{CurrentWeather, Forecast, GenerationOutcome, LatLng, RouteOutcome, RouteRequest},
    pipeline::RoutePlanner,
    planning,
    services::{
        CurrentWeatherProvider, ForecastProvider, ForecastQuery, ReverseGeocoder, ReversePlace,
    },
    throttle::Throttle,
};

/// Everything the handlers share
#[derive(Clone)]
pub struct AppState {
    pub planner: Arc<RoutePlanner<InMemoryMap>>,
    pub geocoder: Arc<dyn ReverseGeocoder>,
    pub forecasts: Arc<dyn ForecastProvider>,
    pub weather: Arc<dyn CurrentWeatherProvider>,
    /// Same throttle the planner paces its geocoding with
    pub geocoder_throttle: Arc<Throttle>,
}

/// Error body returned by every endpoint
#[derive(Debug, Serialize)]
pub struct ApiError {
    #[serde(skip)]
    status: StatusCode,
    pub error: String,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            error: message.into(),
        }
    }
}

impl From<RouteCastError> for ApiError {
    fn from(err: RouteCastError) -> Self {
        let status = match &err {
            RouteCastError::Validation { .. } => StatusCode::BAD_REQUEST,
            RouteCastError::Api { .. }
            | RouteCastError::Parse { .. }
            | RouteCastError::Routing { .. } => StatusCode::BAD_GATEWAY,
            RouteCastError::Config { .. }
            | RouteCastError::Cache { .. }
            | RouteCastError::Io { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status != StatusCode::BAD_REQUEST {
            warn!("Request failed: {}", err);
        }
        Self {
            status,
            error: err.user_message(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self)).into_response()
    }
}

type ApiResult<T> = Result<Json<T>, ApiError>;

/// Where to fetch weather for: a city name, an OpenWeatherMap city id, or
/// coordinates, in that order of preference
#[derive(Debug, Default, Deserialize)]
pub struct ForecastParams {
    pub city: Option<String>,
    pub id: Option<String>,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
}

impl ForecastParams {
    fn into_query(self) -> Result<ForecastQuery, ApiError> {
        let present = |value: &Option<String>| value.as_deref().is_some_and(|v| !v.trim().is_empty());

        if present(&self.city) {
            return Ok(ForecastQuery::City(self.city.unwrap_or_default()));
        }
        if present(&self.id) {
            return Ok(ForecastQuery::Id(self.id.unwrap_or_default()));
        }
        match (self.lat, self.lon) {
            (Some(lat), Some(lon)) => Ok(ForecastQuery::Coordinates(LatLng::new(lat, lon))),
            _ => Err(ApiError::bad_request(
                "Provide a city, an id, or both lat and lon",
            )),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CoordinateParams {
    pub lat: f64,
    pub lon: f64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PlanRequest {
    /// `"CityA-CityB-CityC"`
    pub route: String,
    /// `"YYYY-MM-DD HH:MM"`
    pub date: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiMarker {
    pub position: LatLng,
    pub kind: MarkerKind,
    pub popup: Popup,
    /// Popup rendered in the configured units
    pub text: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnnotateStatus {
    Completed,
    Superseded,
    Empty,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnotateResponse {
    pub status: AnnotateStatus,
    pub outcome: Option<RouteOutcome>,
    /// Route end, `"YYYY-MM-DD HH:MM"` local time
    pub end_date_time: Option<String>,
    pub markers: Vec<ApiMarker>,
    pub route: Option<Vec<LatLng>>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/weather", get(get_current_weather))
        .route("/forecast", get(get_forecast))
        .route("/reverse-geocode", get(reverse_geocode))
        .route("/routes/plan", post(plan_route))
        .route("/routes/annotate", post(annotate_route))
        .with_state(state)
}

async fn get_current_weather(
    State(state): State<AppState>,
    Query(params): Query<ForecastParams>,
) -> ApiResult<CurrentWeather> {
    let query = params.into_query()?;
    Ok(Json(state.weather.current_weather(&query).await?))
}

async fn get_forecast(
    State(state): State<AppState>,
    Query(params): Query<ForecastParams>,
) -> ApiResult<Forecast> {
    let query = params.into_query()?;
    Ok(Json(state.forecasts.forecast(&query).await?))
}

async fn reverse_geocode(
    State(state): State<AppState>,
    Query(params): Query<CoordinateParams>,
) -> ApiResult<Option<ReversePlace>> {
    state.geocoder_throttle.acquire().await;
    let place = state
        .geocoder
        .reverse_geocode(LatLng::new(params.lat, params.lon))
        .await?;
    Ok(Json(place))
}

async fn plan_route(
    State(state): State<AppState>,
    Json(payload): Json<PlanRequest>,
) -> ApiResult<RouteRequest> {
    let request = planning::plan_route(&payload.route, &payload.date, state.forecasts.as_ref()).await?;
    Ok(Json(request))
}

async fn annotate_route(
    State(state): State<AppState>,
    Json(request): Json<RouteRequest>,
) -> ApiResult<AnnotateResponse> {
    let units = state.planner.options().units;
    let (outcome, snapshot) = state
        .planner
        .generate_and_inspect(&request, |view| {
            let surface = view.surface();
            let markers: Vec<ApiMarker> = surface
                .markers()
                .map(|marker| ApiMarker {
                    position: marker.position,
                    kind: marker.kind,
                    popup: marker.popup.clone(),
                    text: marker.popup.render(units),
                })
                .collect();
            (markers, surface.route().map(<[LatLng]>::to_vec))
        })
        .await?;
    // Only a completed generation reports the map it drew
    let (markers, route) = snapshot.unwrap_or_default();

    let (status, outcome) = match outcome {
        GenerationOutcome::Completed(outcome) => (AnnotateStatus::Completed, Some(outcome)),
        GenerationOutcome::Superseded => (AnnotateStatus::Superseded, None),
        GenerationOutcome::Empty => (AnnotateStatus::Empty, None),
    };

    let end_date_time = outcome.as_ref().and_then(|outcome| {
        let first = request.points.first()?;
        let start = first.date.and_time(first.departure_time?);
        planning::end_date_time(
            Some(&start.format("%Y-%m-%d %H:%M").to_string()),
            Some(&outcome.estimated_time),
        )
    });

    Ok(Json(AnnotateResponse {
        status,
        outcome,
        end_date_time,
        markers,
        route,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forecast_params_prefer_city() {
        let params = ForecastParams {
            city: Some("Ghent".to_string()),
            id: Some("2797656".to_string()),
            lat: Some(51.05),
            lon: Some(3.72),
        };
        assert_eq!(
            params.into_query().unwrap(),
            ForecastQuery::City("Ghent".to_string())
        );
    }

    #[test]
    fn test_forecast_params_id_before_coordinates() {
        let params = ForecastParams {
            city: Some(" ".to_string()),
            id: Some("2797656".to_string()),
            lat: Some(51.05),
            lon: Some(3.72),
        };
        assert_eq!(
            params.into_query().unwrap(),
            ForecastQuery::Id("2797656".to_string())
        );
    }

    #[test]
    fn test_forecast_params_need_both_coordinates() {
        let params = ForecastParams {
            lat: Some(51.05),
            ..ForecastParams::default()
        };
        let err = params.into_query().unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_error_status_mapping() {
        let err: ApiError = RouteCastError::routing("no route").into();
        assert_eq!(err.status, StatusCode::BAD_GATEWAY);

        let err: ApiError = RouteCastError::validation("missing departure").into();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);

        let err: ApiError = RouteCastError::cache("disk full").into();
        assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
    }
}
