use switchyard_core::InvocationRequest;

use crate::dispatch::{DispatchError, Dispatcher, ViewResponse, require_service};
use crate::request::InboundRequest;
use crate::view::View;

/// Sends `{id, cluster_id}` plus hook extras and discards whatever the
/// service sends back.
pub(crate) fn run(
    dispatcher: &Dispatcher,
    view: &View,
    request: &InboundRequest,
) -> Result<ViewResponse, DispatchError> {
    let service = require_service(view)?;
    let mut invocation = InvocationRequest::new(request.object_id(), request.session.cluster_id());
    invocation.merge(view.hooks().extra_input(request)?);
    dispatcher.invoke(service, &invocation)?;
    Ok(ViewResponse::Empty)
}
