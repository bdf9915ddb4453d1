use super::*;
use bifrost_protocol::ChatResponse;
use bifrost_protocol::Message;
use bifrost_protocol::Provider;
use bifrost_protocol::RequestInput;
use bifrost_protocol::RequestKind;
use bifrost_protocol::ResponseMetadata;
use bifrost_protocol::ResponsePayload;
use std::sync::Mutex;

fn chat_request() -> BifrostRequest {
    BifrostRequest::new(
        Provider::Openai,
        "gpt-4o-mini",
        RequestInput::ChatCompletion(vec![Message::user("hi")]),
    )
}

fn canned_response(text: &str) -> BifrostResponse {
    BifrostResponse::new(
        ResponsePayload::ChatCompletion(
            ChatResponse::new("resp_1", "gpt-4o-mini")
                .with_content(vec![bifrost_protocol::ContentBlock::text(text)]),
        ),
        ResponseMetadata::new(Provider::Openai, "gpt-4o-mini", RequestKind::ChatCompletion),
    )
}

/// Plugin that records hook invocations in a shared journal.
struct JournalingPlugin {
    name: String,
    journal: Arc<Mutex<Vec<String>>>,
    pre_behavior: PreBehavior,
}

enum PreBehavior {
    Continue,
    ShortCircuitResponse,
    ShortCircuitError,
    Fail,
}

impl JournalingPlugin {
    fn new(name: &str, journal: Arc<Mutex<Vec<String>>>, pre_behavior: PreBehavior) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            journal,
            pre_behavior,
        })
    }

    fn log(&self, entry: &str) {
        self.journal
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(format!("{}:{entry}", self.name));
    }
}

#[async_trait]
impl Plugin for JournalingPlugin {
    fn name(&self) -> &str {
        &self.name
    }

    async fn pre_hook(
        &self,
        _ctx: &mut RequestContext,
        _request: &mut BifrostRequest,
    ) -> Result<Option<ShortCircuit>, BifrostError> {
        self.log("pre");
        match self.pre_behavior {
            PreBehavior::Continue => Ok(None),
            PreBehavior::ShortCircuitResponse => {
                Ok(Some(ShortCircuit::respond(canned_response("canned"))))
            }
            PreBehavior::ShortCircuitError => Ok(Some(ShortCircuit::fail(
                BifrostError::provider_api(403, "blocked by policy"),
            ))),
            PreBehavior::Fail => Err(BifrostError::plugin(&self.name, "pre-hook broke")),
        }
    }

    async fn post_hook(
        &self,
        _ctx: &mut RequestContext,
        _outcome: &mut DispatchOutcome,
    ) -> Result<(), BifrostError> {
        self.log("post");
        Ok(())
    }
}

fn journal_of(journal: &Arc<Mutex<Vec<String>>>) -> Vec<String> {
    journal.lock().unwrap_or_else(|e| e.into_inner()).clone()
}

#[tokio::test]
async fn test_post_hooks_reverse_pre_hook_order() {
    let journal = Arc::new(Mutex::new(Vec::new()));
    let pipeline = PluginPipeline::new(vec![
        JournalingPlugin::new("a", journal.clone(), PreBehavior::Continue),
        JournalingPlugin::new("b", journal.clone(), PreBehavior::Continue),
        JournalingPlugin::new("c", journal.clone(), PreBehavior::Continue),
    ]);

    let mut ctx = RequestContext::new();
    let mut request = chat_request();
    let run = pipeline.run_pre_hooks(&mut ctx, &mut request).await;
    assert_eq!(run.executed, 3);
    assert!(run.short_circuit.is_none());

    let mut outcome: DispatchOutcome = Ok(canned_response("upstream"));
    pipeline
        .run_post_hooks(&mut ctx, run.executed, &mut outcome)
        .await;

    assert_eq!(
        journal_of(&journal),
        vec!["a:pre", "b:pre", "c:pre", "c:post", "b:post", "a:post"]
    );
}

#[tokio::test]
async fn test_short_circuit_skips_later_pre_hooks_but_keeps_symmetry() {
    let journal = Arc::new(Mutex::new(Vec::new()));
    let pipeline = PluginPipeline::new(vec![
        JournalingPlugin::new("a", journal.clone(), PreBehavior::Continue),
        JournalingPlugin::new("b", journal.clone(), PreBehavior::ShortCircuitResponse),
        JournalingPlugin::new("c", journal.clone(), PreBehavior::Continue),
    ]);

    let mut ctx = RequestContext::new();
    let mut request = chat_request();
    let run = pipeline.run_pre_hooks(&mut ctx, &mut request).await;
    assert_eq!(run.executed, 2, "c's pre-hook never ran");

    let short = run.short_circuit.expect("short circuit");
    let mut outcome = pipeline.short_circuit_outcome(short);
    assert_eq!(
        outcome.as_ref().expect("response").as_chat().expect("chat").text(),
        "canned"
    );

    pipeline
        .run_post_hooks(&mut ctx, run.executed, &mut outcome)
        .await;

    // Exactly the executed prefix runs post-hooks, in reverse.
    assert_eq!(
        journal_of(&journal),
        vec!["a:pre", "b:pre", "b:post", "a:post"]
    );
}

#[tokio::test]
async fn test_short_circuit_error() {
    let journal = Arc::new(Mutex::new(Vec::new()));
    let pipeline = PluginPipeline::new(vec![JournalingPlugin::new(
        "gate",
        journal.clone(),
        PreBehavior::ShortCircuitError,
    )]);

    let mut ctx = RequestContext::new();
    let mut request = chat_request();
    let run = pipeline.run_pre_hooks(&mut ctx, &mut request).await;
    let outcome = pipeline.short_circuit_outcome(run.short_circuit.expect("short"));
    let err = outcome.expect_err("policy block");
    assert_eq!(err.status_code, Some(403));
}

#[tokio::test]
async fn test_failed_pre_hook_is_excluded_from_post_hooks() {
    let journal = Arc::new(Mutex::new(Vec::new()));
    let pipeline = PluginPipeline::new(vec![
        JournalingPlugin::new("a", journal.clone(), PreBehavior::Continue),
        JournalingPlugin::new("broken", journal.clone(), PreBehavior::Fail),
        JournalingPlugin::new("c", journal.clone(), PreBehavior::Continue),
    ]);

    let mut ctx = RequestContext::new();
    let mut request = chat_request();
    let run = pipeline.run_pre_hooks(&mut ctx, &mut request).await;
    // The broken plugin does not count toward the executed prefix.
    assert_eq!(run.executed, 2);

    let mut outcome: DispatchOutcome = Ok(canned_response("upstream"));
    pipeline
        .run_post_hooks(&mut ctx, run.executed, &mut outcome)
        .await;

    assert_eq!(
        journal_of(&journal),
        vec!["a:pre", "broken:pre", "c:pre", "c:post", "a:post"],
        "the failed plugin's post-hook must not run"
    );
}

/// Plugin that rewrites failures into a fallback response.
struct RescuePlugin;

#[async_trait]
impl Plugin for RescuePlugin {
    fn name(&self) -> &str {
        "rescue"
    }

    async fn post_hook(
        &self,
        _ctx: &mut RequestContext,
        outcome: &mut DispatchOutcome,
    ) -> Result<(), BifrostError> {
        if outcome.is_err() {
            *outcome = Ok(canned_response("rescued"));
        }
        Ok(())
    }
}

#[tokio::test]
async fn test_post_hook_can_rewrite_failure_into_success() {
    let pipeline = PluginPipeline::new(vec![Arc::new(RescuePlugin)]);
    let mut ctx = RequestContext::new();
    let mut request = chat_request();
    let run = pipeline.run_pre_hooks(&mut ctx, &mut request).await;

    let mut outcome: DispatchOutcome = Err(BifrostError::provider_api(500, "boom"));
    pipeline
        .run_post_hooks(&mut ctx, run.executed, &mut outcome)
        .await;

    let response = outcome.expect("rewritten");
    assert_eq!(response.as_chat().expect("chat").text(), "rescued");
}

struct JsonOnlyInterceptor {
    seen: Arc<Mutex<Vec<String>>>,
}

#[async_trait]
impl TransportInterceptor for JsonOnlyInterceptor {
    async fn intercept(
        &self,
        _ctx: &RequestContext,
        uri: &str,
        headers: &mut HashMap<String, String>,
        body: &mut Value,
    ) -> Result<(), BifrostError> {
        self.seen
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(uri.to_string());
        headers.insert("x-governed".to_string(), "yes".to_string());
        body["team"] = Value::String("platform".to_string());
        Ok(())
    }
}

struct InterceptingPlugin {
    interceptor: Arc<JsonOnlyInterceptor>,
}

#[async_trait]
impl Plugin for InterceptingPlugin {
    fn name(&self) -> &str {
        "governance"
    }

    fn transport_interceptor(&self) -> Option<Arc<dyn TransportInterceptor>> {
        Some(self.interceptor.clone())
    }
}

#[tokio::test]
async fn test_transport_interceptors_apply_to_json_only() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let pipeline = PluginPipeline::new(vec![Arc::new(InterceptingPlugin {
        interceptor: Arc::new(JsonOnlyInterceptor { seen: seen.clone() }),
    })]);

    let ctx = RequestContext::new();
    let mut headers = HashMap::new();
    let mut body = serde_json::json!({"model": "gpt-4o-mini"});

    pipeline
        .run_transport_interceptors(
            &ctx,
            "/v1/chat/completions",
            "application/json",
            &mut headers,
            &mut body,
        )
        .await
        .expect("intercept");
    assert_eq!(headers.get("x-governed").map(String::as_str), Some("yes"));
    assert_eq!(body["team"], "platform");

    // Multipart bodies bypass interception entirely.
    let mut headers = HashMap::new();
    let mut body = serde_json::json!(null);
    pipeline
        .run_transport_interceptors(
            &ctx,
            "/v1/audio/transcriptions",
            "multipart/form-data; boundary=x",
            &mut headers,
            &mut body,
        )
        .await
        .expect("bypass");
    assert!(headers.is_empty());
    assert_eq!(seen.lock().unwrap_or_else(|e| e.into_inner()).len(), 1);
}
