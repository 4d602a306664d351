//! HTTP 路由处理器
//!
//! Each handler gets the store and configuration it needs passed in
//! explicitly and always produces a complete response.

use http::{Method, StatusCode};
use serde::Serialize;

use super::exchange::{Request, Response};
use super::html;
use crate::config::PortalConfig;
use crate::storage::FieldStorage;
use crate::store::ValueStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Config,
    Save,
    Restart,
    ApiConfig,
    NotFound,
}

impl Route {
    pub fn resolve(method: &Method, path: &str) -> Self {
        match path {
            "/" => Route::Config,
            "/save" => Route::Save,
            "/restart" => Route::Restart,
            "/api/config" if *method == Method::GET => Route::ApiConfig,
            _ => Route::NotFound,
        }
    }
}

/// What happened to the pairs submitted to `/save`.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SaveReport {
    pub saved: Vec<String>,
    pub ignored: Vec<String>,
    pub failed: Vec<String>,
}

/// 主页：编辑表单
pub fn handle_config<S: FieldStorage>(config: &PortalConfig, store: &ValueStore<S>) -> Response {
    let values = store.values();
    let body = html::config_form(&config.app_name, store.schema(), &values, |name| {
        config.is_sensitive(name)
    });
    Response::html(StatusCode::OK, body)
}

/// 保存配置
pub fn handle_save<S: FieldStorage>(
    config: &PortalConfig,
    store: &mut ValueStore<S>,
    params: &[(String, String)],
) -> (Response, SaveReport) {
    log::debug!("web: {} args", params.len());

    let mut report = SaveReport::default();
    for (name, value) in params {
        if config.is_sensitive(name) {
            log::debug!("web: arg '{}' = '***'", name);
        } else {
            log::debug!("web: arg '{}' = '{}'", name, value);
        }

        let Some(index) = store.lookup(name) else {
            log::info!("ignored: '{}'", name);
            report.ignored.push(name.clone());
            continue;
        };
        match store.set(index, value) {
            Ok(()) => {
                log::info!("saved: '{}'", name);
                report.saved.push(name.clone());
            }
            Err(e) => {
                log::error!("failed to save '{}': {}", name, e);
                report.failed.push(name.clone());
            }
        }
    }

    let body = html::saved_page(&config.app_name, &report.saved, &report.failed);
    (Response::html(StatusCode::OK, body), report)
}

pub fn handle_restart(config: &PortalConfig) -> Response {
    Response::html(StatusCode::OK, html::restart_page(&config.app_name))
}

pub fn handle_not_found(config: &PortalConfig, path: &str) -> Response {
    log::info!("web: '{}' not found", path);
    Response::html(
        StatusCode::NOT_FOUND,
        html::not_found_page(&config.app_name, path),
    )
}

#[derive(Serialize)]
struct FieldStatus<'a> {
    name: &'a str,
    value: String,
    default: &'a str,
    max_len: usize,
    help: &'a str,
    header: bool,
}

#[derive(Serialize)]
struct ConfigStatus<'a> {
    app: &'a str,
    fields: Vec<FieldStatus<'a>>,
}

/// 获取配置 API（敏感字段脱敏）
pub fn handle_api_config<S: FieldStorage>(
    config: &PortalConfig,
    store: &ValueStore<S>,
) -> Response {
    let fields = store
        .schema()
        .iter()
        .enumerate()
        .map(|(index, field)| {
            let value = store.get(index).unwrap_or_default();
            let value = if config.is_sensitive(&field.name) && !field.is_header() {
                "*".repeat(value.chars().count().min(8))
            } else {
                value.to_string()
            };
            FieldStatus {
                name: &field.name,
                value,
                default: &field.default,
                max_len: field.max_len,
                help: &field.help,
                header: field.is_header(),
            }
        })
        .collect();

    let status = ConfigStatus {
        app: &config.app_name,
        fields,
    };
    match serde_json::to_string(&status) {
        Ok(json) => Response::json(json),
        Err(e) => {
            log::error!("failed to encode config status: {}", e);
            Response::html(
                StatusCode::INTERNAL_SERVER_ERROR,
                html::error_page(&config.app_name, "Internal error."),
            )
        }
    }
}

/// Dispatches `request` to its handler. Returns the response and whether the
/// request asks for a restart.
pub fn dispatch<S: FieldStorage>(
    config: &PortalConfig,
    store: &mut ValueStore<S>,
    request: &Request,
) -> (Response, bool) {
    let route = Route::resolve(&request.method, &request.path);
    if route != Route::NotFound {
        log::info!("web: '{}' ({:?})", request.path, route);
    }
    match route {
        Route::Config => (handle_config(config, store), false),
        Route::Save => {
            let (response, _) = handle_save(config, store, &request.params);
            (response, true)
        }
        Route::Restart => (handle_restart(config), true),
        Route::ApiConfig => (handle_api_config(config, store), false),
        Route::NotFound => (handle_not_found(config, &request.path), false),
    }
}
