use serde_json::{Value, json};
use switchyard_core::InvocationRequest;

use crate::dispatch::{DispatchError, Dispatcher, ViewResponse, require_service};
use crate::request::InboundRequest;
use crate::view::{ChangePasswordOptions, View};

pub(crate) const PASSWORD_FIELD: &str = "password1";
pub(crate) const CONFIRM_FIELD: &str = "password2";

pub(crate) fn run(
    dispatcher: &Dispatcher,
    view: &View,
    options: &ChangePasswordOptions,
    request: &InboundRequest,
) -> Result<ViewResponse, DispatchError> {
    let service = require_service(view)?;
    let mut invocation = InvocationRequest::new(request.object_id(), request.session.cluster_id());
    invocation.merge(view.hooks().extra_input(request)?);
    for (target, source) in [
        (PASSWORD_FIELD, &options.password_field),
        (CONFIRM_FIELD, &options.confirm_field),
    ] {
        let value = request.param(source).unwrap_or_default();
        invocation.insert(target, Value::String(value.to_string()));
    }
    dispatcher.invoke(service, &invocation)?;

    Ok(ViewResponse::Json(json!({ "message": options.success_message })))
}
