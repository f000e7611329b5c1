use serde_json::{Map, Value};

use crate::dispatch::{
    DispatchError, Dispatcher, ViewResponse, build_request, require_service,
};
use crate::normalize::copy_field;
use crate::request::InboundRequest;
use crate::view::{CreateEditOptions, View};

pub(crate) fn run(
    dispatcher: &Dispatcher,
    view: &View,
    options: &CreateEditOptions,
    request: &InboundRequest,
) -> Result<ViewResponse, DispatchError> {
    let service = require_service(view)?;
    let invocation = build_request(
        view,
        request,
        request.param("id"),
        &options.form_prefix,
    )?;
    let response = dispatcher.invoke(service, &invocation)?;
    if !response.ok {
        return Err(DispatchError::ServiceRejected {
            service: service.to_string(),
        });
    }

    let hooks = view.hooks();
    let message = hooks.success_message(&response.data, options.verb(), dispatcher.locale())?;

    let mut reply = Map::new();
    reply.insert("message".into(), Value::String(message));
    reply.extend(hooks.extra_return(request)?);

    let schema = view.schema();
    for name in schema
        .output_optional()
        .iter()
        .chain(schema.output_required())
    {
        reply.insert(name.clone(), copy_field(&response.data, name));
    }

    Ok(ViewResponse::Json(Value::Object(reply)))
}
