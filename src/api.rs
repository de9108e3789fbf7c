use crate::{
    device_coordinator::{CoordinatorFactory, RuntimeContext},
    entry::{ConfigEntry, ConfigInput, EntryOptions},
    http_response::handle_service_result,
    record_store::RecordStore,
    services::{options_flow::OptionsFlow, setup_flow::SetupFlowService},
};
use actix_web::{HttpResponse, Responder, web};
use anyhow::Result;
use log::{debug, error};
use serde_valid::Validate;

pub struct Api<Store, Factory>
where
    Store: RecordStore,
    Factory: CoordinatorFactory,
{
    pub store: Store,
    pub factory: Factory,
    pub runtime: RuntimeContext,
    pub setup_url: String,
}

impl<Store, Factory> Api<Store, Factory>
where
    Store: RecordStore,
    Factory: CoordinatorFactory,
{
    pub fn new(
        store: Store,
        factory: Factory,
        runtime: RuntimeContext,
        setup_url: impl Into<String>,
    ) -> Self {
        Api {
            store,
            factory,
            runtime,
            setup_url: setup_url.into(),
        }
    }

    pub async fn user_form(api: web::Data<Self>) -> impl Responder {
        debug!("user_form() called");

        let form = SetupFlowService::step_user(
            &api.store,
            &api.factory,
            &api.runtime,
            &api.setup_url,
            None,
        )
        .await;

        handle_service_result(form, "user_form")
    }

    pub async fn submit_user(
        body: web::Json<ConfigInput>,
        api: web::Data<Self>,
    ) -> impl Responder {
        debug!("submit_user() called: {:?}", *body);

        if let Err(e) = body.validate() {
            error!("submit_user rejected input: {e}");
            return HttpResponse::BadRequest().body(e.to_string());
        }

        let result = SetupFlowService::step_user(
            &api.store,
            &api.factory,
            &api.runtime,
            &api.setup_url,
            Some(body.into_inner()),
        )
        .await
        .map(|result| result.map_result(|entry| entry.redacted()));

        handle_service_result(result, "submit_user")
    }

    pub async fn entries(api: web::Data<Self>) -> impl Responder {
        debug!("entries() called");

        let entries = api
            .store
            .entries()
            .await
            .map(|entries| entries.iter().map(ConfigEntry::redacted).collect::<Vec<_>>());

        handle_service_result(entries, "entries")
    }

    pub async fn options_form(path: web::Path<String>, api: web::Data<Self>) -> impl Responder {
        debug!("options_form() called: {path}");

        let flow = match api.options_flow(&path).await {
            Ok(Some(flow)) => flow,
            Ok(None) => return HttpResponse::NotFound().finish(),
            Err(e) => return handle_service_result::<()>(Err(e), "options_form"),
        };

        handle_service_result(flow.step_init(&api.store, None).await, "options_form")
    }

    pub async fn submit_options(
        path: web::Path<String>,
        body: web::Json<EntryOptions>,
        api: web::Data<Self>,
    ) -> impl Responder {
        debug!("submit_options() called: {path} {:?}", *body);

        if let Err(e) = body.validate() {
            error!("submit_options rejected input: {e}");
            return HttpResponse::BadRequest().body(e.to_string());
        }

        let flow = match api.options_flow(&path).await {
            Ok(Some(flow)) => flow,
            Ok(None) => return HttpResponse::NotFound().finish(),
            Err(e) => return handle_service_result::<()>(Err(e), "submit_options"),
        };

        handle_service_result(
            flow.step_init(&api.store, Some(body.into_inner())).await,
            "submit_options",
        )
    }

    pub async fn version() -> impl Responder {
        HttpResponse::Ok().body(env!("CARGO_PKG_VERSION"))
    }

    async fn options_flow(&self, entry_id: &str) -> Result<Option<OptionsFlow>> {
        Ok(self
            .store
            .entry(entry_id)
            .await?
            .map(SetupFlowService::options_flow))
    }
}

/// Register all flow routes for an `Api` instance
pub fn configure<Store, Factory>(cfg: &mut web::ServiceConfig)
where
    Store: RecordStore + 'static,
    Factory: CoordinatorFactory + 'static,
{
    cfg.route("/flows/user", web::get().to(Api::<Store, Factory>::user_form))
        .route("/flows/user", web::post().to(Api::<Store, Factory>::submit_user))
        .route("/entries", web::get().to(Api::<Store, Factory>::entries))
        .route(
            "/entries/{entry_id}/options",
            web::get().to(Api::<Store, Factory>::options_form),
        )
        .route(
            "/entries/{entry_id}/options",
            web::post().to(Api::<Store, Factory>::submit_options),
        )
        .route("/version", web::get().to(Api::<Store, Factory>::version));
}
