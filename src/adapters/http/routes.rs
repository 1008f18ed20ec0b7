use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use crate::adapters::http::state::HttpState;
use crate::application::dto::{
    ApiKeyRequest, CatalogEntry, ErrorResponse, OkResponse, PrepareStreamingRequest,
    SelectLanguageRequest, SelectModelRequest, SelectQualityRequest, SettingsResponse,
};
use crate::domain::{
    device::PermissionStatus,
    errors::{DomainError, DomainResult},
    settings::{AiModel, OutputLanguage, StreamQuality},
};

fn error_response(e: DomainError) -> Response {
    let status = match &e {
        DomainError::NotFound(_) => StatusCode::NOT_FOUND,
        DomainError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        DomainError::PermissionDenied(_) => StatusCode::FORBIDDEN,
        DomainError::Session(_) | DomainError::Capture(_) => StatusCode::BAD_GATEWAY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, Json(ErrorResponse { error: e.to_string() })).into_response()
}

fn ok_or_error(result: DomainResult<()>) -> Response {
    match result {
        Ok(()) => Json(OkResponse { ok: true }).into_response(),
        Err(e) => error_response(e),
    }
}

fn jpeg(bytes: Vec<u8>) -> Response {
    ([(header::CONTENT_TYPE, "image/jpeg")], bytes).into_response()
}

pub async fn get_status(State(st): State<HttpState>) -> impl IntoResponse {
    Json(st.devices.snapshot())
}

pub async fn start_search(State(st): State<HttpState>) -> Response {
    ok_or_error(st.devices.start_device_search().await)
}

pub async fn stop_search(State(st): State<HttpState>) -> Response {
    st.devices.stop_device_search();
    ok_or_error(Ok(()))
}

pub async fn disconnect(State(st): State<HttpState>) -> Response {
    ok_or_error(st.devices.disconnect().await)
}

pub async fn prepare_streaming(
    State(st): State<HttpState>,
    Json(req): Json<PrepareStreamingRequest>,
) -> Response {
    // El cliente responde por adelantado a la posible petición de permiso.
    let answer = if req.grant { PermissionStatus::Granted } else { PermissionStatus::Denied };
    ok_or_error(st.devices.navigate_to_streaming(move |_| async move { answer }).await)
}

pub async fn leave_streaming(State(st): State<HttpState>) -> Response {
    st.devices.navigate_to_device_selection();
    ok_or_error(Ok(()))
}

pub async fn start_stream(State(st): State<HttpState>) -> Response {
    ok_or_error(st.devices.start_stream().await)
}

pub async fn stop_stream(State(st): State<HttpState>) -> Response {
    st.devices.stop_stream().await;
    ok_or_error(Ok(()))
}

pub async fn get_frame(State(st): State<HttpState>) -> Response {
    match st.devices.last_frame() {
        Some(frame) => jpeg(frame.jpeg.clone()),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

pub async fn take_photo(State(st): State<HttpState>) -> Response {
    match st.devices.take_photo().await {
        Ok(Some(photo)) => jpeg(photo.jpeg.clone()),
        Ok(None) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => error_response(e),
    }
}

pub async fn get_photo(State(st): State<HttpState>) -> Response {
    match st.devices.captured_photo() {
        Some(photo) => jpeg(photo.jpeg.clone()),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

pub async fn clear_photo(State(st): State<HttpState>) -> Response {
    st.devices.clear_captured_photo();
    ok_or_error(Ok(()))
}

pub async fn clear_error(State(st): State<HttpState>) -> Response {
    st.devices.clear_error();
    ok_or_error(Ok(()))
}

pub async fn get_settings(State(st): State<HttpState>) -> Response {
    let s = &st.settings;
    let conversation_count = match s.conversation_count().await {
        Ok(count) => count,
        Err(e) => return error_response(e),
    };

    Json(SettingsResponse {
        has_api_key: s.has_api_key(),
        api_key_masked: s.masked_api_key(),
        model: s.selected_model(),
        model_display_name: s.selected_model_display_name(),
        language: s.selected_language(),
        language_display_name: s.selected_language_display_name(),
        quality: s.selected_quality(),
        quality_display_name: s.selected_quality_display_name(),
        conversation_count,
        models: s.available_models().iter().copied().map(CatalogEntry::from).collect(),
        languages: s.available_languages().iter().copied().map(CatalogEntry::from).collect(),
        qualities: s.available_qualities().iter().copied().map(CatalogEntry::from).collect(),
    })
    .into_response()
}

pub async fn save_api_key(State(st): State<HttpState>, Json(req): Json<ApiKeyRequest>) -> Response {
    ok_or_error(st.settings.save_api_key(&req.api_key))
}

pub async fn delete_api_key(State(st): State<HttpState>) -> Response {
    ok_or_error(st.settings.delete_api_key())
}

pub async fn select_model(State(st): State<HttpState>, Json(req): Json<SelectModelRequest>) -> Response {
    match AiModel::from_id(&req.model) {
        Some(model) => ok_or_error(st.settings.select_model(model)),
        None => error_response(DomainError::InvalidInput(format!("modelo desconocido: {}", req.model))),
    }
}

pub async fn select_language(
    State(st): State<HttpState>,
    Json(req): Json<SelectLanguageRequest>,
) -> Response {
    match OutputLanguage::from_code(&req.language) {
        Some(language) => ok_or_error(st.settings.select_language(language)),
        None => error_response(DomainError::InvalidInput(format!("idioma desconocido: {}", req.language))),
    }
}

pub async fn select_quality(
    State(st): State<HttpState>,
    Json(req): Json<SelectQualityRequest>,
) -> Response {
    match StreamQuality::from_id(&req.quality) {
        Some(quality) => ok_or_error(st.settings.select_quality(quality)),
        None => error_response(DomainError::InvalidInput(format!("calidad desconocida: {}", req.quality))),
    }
}

pub async fn delete_conversations(State(st): State<HttpState>) -> Response {
    ok_or_error(st.settings.delete_all_conversations().await)
}
