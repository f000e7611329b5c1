use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use switchyard_core::gateway::optional_string;

use crate::datetime::{js_dt_format, sample_dt};
use crate::dispatch::DispatchError;
use crate::i18n;
use crate::normalize::{encode_text, is_truthy, lookup};
use crate::request::InboundRequest;
use crate::view::{HandleContext, Verb, ViewHooks};

/// Hooks assembled from a view declaration instead of code.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DeclarativeHooks {
    /// Constant fields added to every invocation.
    pub extra_input: Map<String, Value>,
    /// Request parameters copied verbatim into the invocation.
    pub forward_params: Vec<String>,
    /// Constant render fields for index views, extra reply fields for
    /// create/edit views.
    pub extra: Map<String, Value>,
    /// Human name of the object, e.g. `outgoing connection`. Required for
    /// create/edit success messages.
    pub object_label: Option<String>,
    /// Response field naming the saved object.
    pub name_field: Option<String>,
    /// Adds the user's date-time picker formats and a sample timestamp.
    pub datetime_hints: bool,
}

impl ViewHooks for DeclarativeHooks {
    fn extra_input(&self, request: &InboundRequest) -> Result<Map<String, Value>, DispatchError> {
        let mut extra = self.extra_input.clone();
        for name in &self.forward_params {
            extra.insert(name.clone(), optional_string(request.param(name)));
        }
        Ok(extra)
    }

    fn handle(&self, ctx: &HandleContext<'_>) -> Result<Map<String, Value>, DispatchError> {
        let mut extra = self.extra.clone();
        if self.datetime_hints
            && let Some(profile) = ctx.request.session.profile.as_ref()
        {
            let sample = sample_dt(profile, Utc::now())
                .map_err(|err| DispatchError::Hook(Box::new(err)))?;
            let format = js_dt_format(profile);
            extra.insert("js_date_format".into(), Value::String(format.js_date_format));
            extra.insert(
                "js_time_format".into(),
                Value::String(format.js_time_format.to_string()),
            );
            extra.insert("js_ampm".into(), Value::Bool(format.js_ampm));
            extra.insert("sample_dt".into(), Value::String(sample));
        }
        Ok(extra)
    }

    fn success_message(
        &self,
        data: &Value,
        verb: Verb,
        locale: &str,
    ) -> Result<String, DispatchError> {
        let Some(object) = self.object_label.as_deref() else {
            return Err(DispatchError::NotImplemented {
                hook: "success_message",
            });
        };
        let name = self
            .name_field
            .as_deref()
            .and_then(|field| data.as_object().and_then(|record| lookup(record, field)))
            .map(|field| field.resolve())
            .filter(|value| is_truthy(value))
            .map(encode_text);

        let message = match name {
            Some(name) => i18n::format_message(
                i18n::SAVED,
                "Successfully {verb} the {object} [{name}]",
                locale,
                &[("verb", verb.as_str()), ("object", object), ("name", &name)],
            ),
            None => i18n::format_message(
                i18n::SAVED_UNNAMED,
                "Successfully {verb} the {object}",
                locale,
                &[("verb", verb.as_str()), ("object", object)],
            ),
        };
        Ok(message)
    }

    fn extra_return(&self, _request: &InboundRequest) -> Result<Map<String, Value>, DispatchError> {
        Ok(self.extra.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datetime::UserProfile;
    use axum::http::Method;
    use serde_json::json;

    fn hooks() -> DeclarativeHooks {
        DeclarativeHooks {
            object_label: Some("channel".into()),
            name_field: Some("name".into()),
            ..DeclarativeHooks::default()
        }
    }

    #[test]
    fn message_names_the_saved_object() {
        let data = json!({"id": 7, "name": {"text": "crm"}});
        let message = hooks().success_message(&data, Verb::Updated, "en").unwrap();
        assert_eq!(message, "Successfully updated the channel [crm]");
    }

    #[test]
    fn message_without_name_omits_brackets() {
        let message = hooks()
            .success_message(&json!({"id": 7}), Verb::Created, "en")
            .unwrap();
        assert_eq!(message, "Successfully created the channel");
    }

    #[test]
    fn missing_label_is_not_implemented() {
        let err = DeclarativeHooks::default()
            .success_message(&Value::Null, Verb::Created, "en")
            .unwrap_err();
        assert!(matches!(err, DispatchError::NotImplemented { .. }));
    }

    #[test]
    fn forwarded_params_become_inputs() {
        let hooks = DeclarativeHooks {
            extra_input: Map::from_iter([("kind".to_string(), json!("plain_http"))]),
            forward_params: vec!["connection".into(), "missing".into()],
            ..DeclarativeHooks::default()
        };
        let request = InboundRequest::new(Method::POST).with_param("connection", "outgoing");
        let extra = hooks.extra_input(&request).unwrap();
        assert_eq!(
            Value::Object(extra),
            json!({"kind": "plain_http", "connection": "outgoing", "missing": null})
        );
    }

    #[test]
    fn datetime_hints_follow_the_profile() {
        let hooks = DeclarativeHooks {
            datetime_hints: true,
            ..DeclarativeHooks::default()
        };
        let mut request = InboundRequest::new(Method::GET);
        request.session.profile = Some(UserProfile {
            date_format: "dd-mm-yyyy".into(),
            time_format: "12".into(),
        });
        let ctx = HandleContext {
            request: &request,
            locale: "en",
        };
        let extra = hooks.handle(&ctx).unwrap();
        assert_eq!(extra["js_date_format"], json!("dd-mm-yy"));
        assert_eq!(extra["js_ampm"], json!(true));
        assert!(extra.contains_key("sample_dt"));
    }
}
