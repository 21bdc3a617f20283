use actix_cors::Cors;
use actix_web::http::header::{ACCEPT, HeaderMap};
use actix_web::middleware::Condition;
use actix_web::{dev::Server, get, web, App, HttpRequest, HttpResponse, HttpServer};
use serde_json::{json, Map};
use tracing::{debug, info};

use crate::application::use_cases::data_table::{DataTableContext, DataTableService, Rendered};
use crate::application::use_cases::users_data_table::UsersDataTable;
use crate::domain::error::AppError;
use crate::domain::request::{is_ajax_signal, TableRequest};
use crate::domain::row::RowExt;
use crate::infrastructure::config::ServerConfig;
use crate::infrastructure::response::{export_response, html_response};
use crate::infrastructure::view::USERS_VIEW;

pub struct HttpState {
    pub context: DataTableContext,
}

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|value| value.to_str().ok())
}

/// Query parameters plus the AJAX signal of an incoming request.
pub fn table_request(req: &HttpRequest) -> TableRequest {
    let headers = req.headers();
    let ajax = is_ajax_signal(
        header(headers, "x-requested-with"),
        header(headers, ACCEPT.as_str()),
    );
    TableRequest::from_query_string(req.query_string(), ajax)
}

pub fn respond(rendered: Rendered) -> HttpResponse {
    match rendered {
        Rendered::Json(envelope) => HttpResponse::Ok().json(envelope),
        Rendered::Html(html) => html_response(html),
        Rendered::Export(file) => export_response(file),
    }
}

#[get("/users")]
async fn users(data: web::Data<HttpState>, req: HttpRequest) -> Result<HttpResponse, AppError> {
    let request = table_request(&req);
    debug!(ajax = request.is_ajax(), action = ?request.action(), "GET /users");

    let table = data.context.table(UsersDataTable);
    let rendered = table.render(&request, USERS_VIEW, Map::new()).await?;
    Ok(respond(rendered))
}

#[get("/users/before")]
async fn users_before(
    data: web::Data<HttpState>,
    req: HttpRequest,
) -> Result<HttpResponse, AppError> {
    let table = data.context.table(UsersDataTable).before(|dt| {
        dt.add_column("nameX", |row| json!(format!("{}X", row.text("name"))));
    });
    let rendered = table.render(&table_request(&req), USERS_VIEW, Map::new()).await?;
    Ok(respond(rendered))
}

#[get("/users/response")]
async fn users_response(
    data: web::Data<HttpState>,
    req: HttpRequest,
) -> Result<HttpResponse, AppError> {
    let table = data.context.table(UsersDataTable).response(|mut envelope| {
        envelope.records_total = 2;
        envelope.records_filtered = 1;
        envelope
    });
    let rendered = table.render(&table_request(&req), USERS_VIEW, Map::new()).await?;
    Ok(respond(rendered))
}

/// A data table bound directly as the route's action.
async fn route_action<S>(data: web::Data<HttpState>, req: HttpRequest) -> Result<HttpResponse, AppError>
where
    S: DataTableService + Default + 'static,
{
    let table = data.context.table(S::default());
    let rendered = table.invoke(&table_request(&req)).await?;
    Ok(respond(rendered))
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(users)
        .service(users_before)
        .service(users_response)
        .service(
            web::resource("/datatables-as-route-action")
                .route(web::get().to(route_action::<UsersDataTable>)),
        );
}

pub fn start_server(context: DataTableContext, config: &ServerConfig) -> std::io::Result<Server> {
    let state = web::Data::new(HttpState { context });
    let permissive = config.cors_permissive;

    let server = HttpServer::new(move || {
        App::new()
            .wrap(Condition::new(permissive, Cors::permissive()))
            .app_data(state.clone())
            .configure(configure)
    })
    .bind((config.host.as_str(), config.port))?
    .run();

    info!(host = %config.host, port = config.port, "HTTP server listening");
    Ok(server)
}
