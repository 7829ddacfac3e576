//! Receiving side of the public API.
//!
//! Decodes an inbound intent and routes it: custom API actions go through
//! [`handle`], everything else is an organic share for one engine.

use crate::dispatcher::{Dispatcher, Outcome, Route};
use crate::engines::Engine;
use crate::error::Result;
use crate::facade::{self, actions};
use crate::intent::Intent;
use log::debug;

#[derive(Debug)]
pub enum Reply {
    /// A search ran to a terminal state.
    Search(Outcome),
    /// The engine list was returned to the caller.
    Engines(Vec<String>),
}

/// Handle a custom API action.
pub async fn handle(dispatcher: &Dispatcher, intent: &Intent) -> Reply {
    if intent.action() == Some(actions::GET_SEARCH_ENGINES) {
        let result = facade::search_engines_result();
        let ids = facade::parse_search_engines_result(Some(&result)).unwrap_or_default();
        debug!("returning {} engines", ids.len());
        dispatcher.platform().set_result(result);
        return Reply::Engines(ids);
    }
    Reply::Search(dispatcher.dispatch(intent, Route::Api).await)
}

/// Route any inbound intent. `engine` applies to organic shares only.
pub async fn receive(dispatcher: &Dispatcher, intent: &Intent, engine: Engine) -> Reply {
    match intent.action() {
        Some(action) if actions::is_api_action(action) => handle(dispatcher, intent).await,
        _ => Reply::Search(dispatcher.dispatch(intent, Route::Share(engine)).await),
    }
}

/// Decode an intent that crossed the process boundary as JSON.
pub fn decode(json: &str) -> Result<Intent> {
    Ok(serde_json::from_str(json)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::UrlPolicy;
    use crate::dispatcher::tests::{FakeHost, RecordingPlatform};
    use crate::error::Error;
    use crate::facade::extras;
    use crate::intent::{ACTION_PROCESS_TEXT, EXTRA_PROCESS_TEXT};
    use std::sync::Arc;

    fn setup() -> (Arc<RecordingPlatform>, Dispatcher) {
        let platform = Arc::new(RecordingPlatform::default());
        let dispatcher = Dispatcher::new(
            platform.clone(),
            Arc::new(FakeHost::ok("https://hosted.example.com/a.jpg")),
            UrlPolicy::default(),
            65_536,
        );
        (platform, dispatcher)
    }

    #[tokio::test]
    async fn test_get_search_engines_sets_result_without_toast() {
        let (platform, dispatcher) = setup();
        let reply = handle(&dispatcher, &facade::get_search_engines_intent()).await;

        match reply {
            Reply::Engines(ids) => assert_eq!(ids.len(), Engine::ALL.len()),
            other => panic!("unexpected reply: {:?}", other),
        }
        let results = platform.results.lock().unwrap();
        assert_eq!(results.len(), 1);
        assert!(facade::parse_search_engines_result(results.first()).is_some());
        assert!(platform.messages().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_engine_is_terminal_failure() {
        let (platform, dispatcher) = setup();
        let intent = facade::search_image_url_intent("http://a.com/i.jpg", Engine::default())
            .put_extra(extras::SEARCH_ENGINE, "tineye");

        let reply = handle(&dispatcher, &intent).await;

        assert!(matches!(
            reply,
            Reply::Search(Outcome::Failed(Error::UnsupportedEngine(_)))
        ));
        assert_eq!(platform.messages(), vec!["unsupported search engine: tineye".to_string()]);
    }

    #[tokio::test]
    async fn test_receive_routes_json_intents() {
        let (platform, dispatcher) = setup();
        let json = serde_json::to_string(&facade::search_image_url_intent(
            "http://a.com/i.jpg",
            Engine::SauceNao,
        ))
        .unwrap();

        let intent = decode(&json).unwrap();
        let reply = receive(&dispatcher, &intent, Engine::Iqdb).await;

        assert!(matches!(reply, Reply::Search(Outcome::Delivered { engine: Engine::SauceNao, .. })));
        assert_eq!(
            platform.launched()[0].data.as_deref(),
            Some("https://saucenao.com/search.php?url=http%3A%2F%2Fa.com%2Fi.jpg")
        );
    }

    #[tokio::test]
    async fn test_receive_organic_share_uses_given_engine() {
        let (platform, dispatcher) = setup();
        let intent = Intent::new(ACTION_PROCESS_TEXT).put_extra(EXTRA_PROCESS_TEXT, "https://example.com/cat.png");

        let reply = receive(&dispatcher, &intent, Engine::Ascii2d).await;

        assert!(matches!(reply, Reply::Search(Outcome::Delivered { engine: Engine::Ascii2d, .. })));
        assert_eq!(platform.messages(), vec!["Searching with Ascii2d".to_string()]);
    }

    #[test]
    fn test_decode_rejects_malformed_json() {
        assert!(matches!(decode("{not json"), Err(Error::Json(_))));
    }
}
