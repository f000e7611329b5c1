use serde_json::Value;
use tracing::{Level, span};

use crate::dispatch::{DispatchError, Dispatcher, RenderPayload, ViewResponse, build_request};
use crate::normalize::{ITEM_PATH, NormalizeError, RenderRecord, normalize_many, normalize_one};
use crate::request::InboundRequest;
use crate::schema::FieldSchema;
use crate::view::{HandleContext, IndexOptions, View};

pub(crate) fn run(
    dispatcher: &Dispatcher,
    view: &View,
    options: &IndexOptions,
    request: &InboundRequest,
) -> Result<ViewResponse, DispatchError> {
    let cluster_id = request.session.cluster_id();
    let mut payload = RenderPayload {
        cluster_id: cluster_id.map(str::to_string),
        zato_clusters: request.session.clusters.clone(),
        choose_cluster_form: request.session.choose_cluster_form.clone(),
        ..RenderPayload::default()
    };

    match (view.service_name(), cluster_id) {
        (Some(service), Some(_)) => {
            let invocation = build_request(view, request, request.object_id(), "")?;
            let response = dispatcher.invoke(service, &invocation)?;
            if response.ok {
                let repeated = view.schema().output_repeated();
                let normalize_span = span!(Level::DEBUG, "normalize", repeated);
                let _normalize_guard = normalize_span.enter();
                if repeated {
                    payload.items = normalize_many(view.schema(), &response.data)?;
                } else {
                    payload.item = single_item(view.schema(), &response.data)?;
                }
            } else {
                tracing::debug!(service, "service returned no data");
            }
        }
        (None, _) => dispatcher.skip_invocation("no service"),
        (Some(_), None) => dispatcher.skip_invocation("no cluster selected"),
    }

    let ctx = HandleContext {
        request,
        locale: dispatcher.locale(),
    };
    payload.extra = view.hooks().handle(&ctx)?;

    Ok(ViewResponse::Render {
        template: options.template.clone(),
        payload,
    })
}

/// `data.item` when the service nests the record, `data` itself otherwise.
fn single_item(schema: &FieldSchema, data: &Value) -> Result<Option<RenderRecord>, NormalizeError> {
    let raw = match data {
        Value::Null => return Ok(None),
        Value::Object(map) => match map.get(ITEM_PATH) {
            Some(item @ Value::Object(_)) => item,
            _ => data,
        },
        other => other,
    };
    normalize_one(schema, raw).map(Some)
}
