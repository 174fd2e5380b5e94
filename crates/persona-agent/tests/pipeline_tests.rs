// SPDX-FileCopyrightText: 2026 Persona Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end turn tests against the mock platform, model, and voice stack.

use std::sync::Arc;
use std::time::Duration;

use persona_agent::{
    DispatchSummary, Pacer, TurnOutcome, TurnPipeline, TurnSettings, VoiceAction, WebFetcher,
};
use persona_config::model::VoiceConfig;
use persona_core::{
    Attachment, Author, ChannelId, GuildId, MessageId, PersonaProfile, ReactionEvent, UserId,
};
use persona_relationship::RelationshipStore;
use persona_test_utils::fixtures::{self, CHANNEL, GUILD};
use persona_test_utils::{MockPlatform, MockProvider, MockSynthesizer, MockVoiceGateway, VoiceCall};
use persona_voice::VoiceManager;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const OWNER: &str = "owner-1";

struct VoiceStack {
    manager: Arc<VoiceManager>,
    gateway: Arc<MockVoiceGateway>,
    synthesizer: Arc<MockSynthesizer>,
}

struct Harness {
    platform: Arc<MockPlatform>,
    provider: Arc<MockProvider>,
    store: Arc<RelationshipStore>,
    voice: Option<VoiceStack>,
    pipeline: TurnPipeline,
    _dir: TempDir,
}

fn profile() -> PersonaProfile {
    PersonaProfile {
        name: "Mika".into(),
        system_rule: "You are Mika.".into(),
        language: "English".into(),
    }
}

fn settings(rejection_gate: bool) -> TurnSettings {
    TurnSettings {
        profile: profile(),
        rejection_gate,
        reply_probability: 1.0,
        history_limit: 10,
        owner: Some(UserId::from(OWNER)),
    }
}

async fn harness_with(settings: TurnSettings, voice: bool) -> Harness {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(
        RelationshipStore::load(dir.path().join("fav.json"), dir.path().join("mem.json")).await,
    );
    let platform = Arc::new(MockPlatform::new());
    let provider = Arc::new(MockProvider::new());

    let voice = voice.then(|| {
        let gateway = Arc::new(MockVoiceGateway::new());
        let synthesizer = Arc::new(MockSynthesizer::new());
        let manager = VoiceManager::new(
            gateway.clone(),
            synthesizer.clone(),
            Arc::new(MockProvider::new()),
            profile(),
            VoiceConfig::default(),
        );
        VoiceStack {
            manager,
            gateway,
            synthesizer,
        }
    });

    let pipeline = TurnPipeline::new(
        settings,
        platform.clone(),
        provider.clone(),
        store.clone(),
        voice.as_ref().map(|v| v.manager.clone()),
        WebFetcher::new(Duration::from_secs(5)).unwrap(),
        Pacer::with_random_pause(1..=2),
    );

    Harness {
        platform,
        provider,
        store,
        voice,
        pipeline,
        _dir: dir,
    }
}

async fn harness() -> Harness {
    harness_with(settings(false), false).await
}

fn alice() -> UserId {
    UserId::from("user-1")
}

fn hello() -> persona_core::InboundMessage {
    fixtures::message("m1", "user-1", "Alice", "hello")
}

fn dispatched(outcome: TurnOutcome) -> DispatchSummary {
    match outcome {
        TurnOutcome::Dispatched(summary) => summary,
        other => panic!("expected a dispatched turn, got {other:?}"),
    }
}

#[tokio::test]
async fn bot_messages_are_ignored() {
    let h = harness().await;
    let mut msg = hello();
    msg.author.bot = true;

    assert_eq!(h.pipeline.handle_message(msg).await, TurnOutcome::Ignored);
    assert_eq!(h.provider.call_count().await, 0);
    assert!(h.platform.calls().await.is_empty());
}

#[tokio::test]
async fn full_turn_applies_state_and_dispatches() {
    let h = harness().await;
    let msg = hello();
    h.platform
        .set_history(&ChannelId::from(CHANNEL), vec![fixtures::history_of(&msg)])
        .await;
    h.provider
        .push_reply(r#"```json
{"favorabilityChange": 0.5, "response": "hi there", "reaction": "👋", "newMemory": "They said hi."}
```"#)
        .await;

    let summary = dispatched(h.pipeline.handle_message(msg).await);
    assert_eq!(summary.messages_sent, 1);
    assert!(summary.reacted);

    assert_eq!(
        h.platform.sends().await,
        vec![("hi there".to_string(), Some(MessageId::from("m1")))]
    );
    assert_eq!(h.platform.reactions().await, vec!["👋"]);
    assert_eq!(h.store.favorability(&alice()).await, 0.5);
    assert_eq!(h.store.memories(&alice()).await, vec!["They said hi."]);

    let prompt = &h.provider.prompts().await[0];
    assert!(prompt.contains("My name is \"Mika\""));
    assert!(prompt.contains("The recent chat history is:\nAlice: hello"));
    assert!(!prompt.contains("_VC"));
}

#[tokio::test]
async fn typing_is_shown_before_the_action_call() {
    let h = harness().await;
    h.provider.push_reply(r#"{"favorabilityChange": 0}"#).await;

    let summary = dispatched(h.pipeline.handle_message(hello()).await);
    assert_eq!(summary, DispatchSummary::default());
    assert_eq!(h.platform.typing_count().await, 1);
    assert!(h.platform.sent_texts().await.is_empty());
}

#[tokio::test]
async fn rejection_gate_no_leaves_everything_untouched() {
    let h = harness_with(settings(true), false).await;
    h.provider.push_reply(r#"{"shouldRespond": false}"#).await;

    assert_eq!(h.pipeline.handle_message(hello()).await, TurnOutcome::Rejected);
    assert_eq!(h.provider.call_count().await, 1);
    assert!(h.platform.calls().await.is_empty());
    assert_eq!(h.store.snapshot(&alice()).await, Default::default());
}

#[tokio::test]
async fn unparseable_gate_reply_fails_closed() {
    let h = harness_with(settings(true), false).await;
    h.provider.push_reply("I think so!").await;

    assert_eq!(h.pipeline.handle_message(hello()).await, TurnOutcome::Rejected);
    assert_eq!(h.platform.typing_count().await, 0);
}

#[tokio::test]
async fn gate_yes_proceeds_to_action() {
    let h = harness_with(settings(true), false).await;
    h.provider.push_reply(r#"{"shouldRespond": true}"#).await;
    h.provider
        .push_reply(r#"{"favorabilityChange": 1, "response": "sure"}"#)
        .await;

    dispatched(h.pipeline.handle_message(hello()).await);
    let prompts = h.provider.prompts().await;
    assert_eq!(prompts.len(), 2);
    assert!(prompts[0].contains("They just said: \"hello\"."));
    assert!(prompts[1].contains("I have decided to respond."));
    assert_eq!(h.platform.sent_texts().await, vec!["sure"]);
}

#[tokio::test]
async fn contract_violation_aborts_without_mutation() {
    let h = harness().await;
    h.provider.push_reply("Sorry, I can't do JSON today.").await;

    assert_eq!(
        h.pipeline.handle_message(hello()).await,
        TurnOutcome::ContractViolation
    );
    assert!(h.platform.sent_texts().await.is_empty());
    assert!(h.platform.reactions().await.is_empty());
    assert_eq!(h.store.favorability(&alice()).await, 0.0);
}

#[tokio::test]
async fn backend_failure_is_silent() {
    let h = harness().await;
    h.provider.push_failure().await;

    assert_eq!(h.pipeline.handle_message(hello()).await, TurnOutcome::NoReply);
    assert!(h.platform.sent_texts().await.is_empty());
}

#[tokio::test]
async fn paced_reply_is_split_and_only_first_part_threads() {
    let h = harness().await;
    h.provider
        .push_reply(r#"{"favorabilityChange": 0, "response": "A[PAUSE=100]B"}"#)
        .await;

    let summary = dispatched(h.pipeline.handle_message(hello()).await);
    assert_eq!(summary.messages_sent, 2);
    assert_eq!(
        h.platform.sends().await,
        vec![
            ("A".to_string(), Some(MessageId::from("m1"))),
            ("B".to_string(), None),
        ]
    );
}

#[tokio::test]
async fn whitespace_only_reply_sends_nothing() {
    let h = harness().await;
    h.provider
        .push_reply(r#"{"favorabilityChange": 0, "response": "   [PAUSE]   "}"#)
        .await;

    let summary = dispatched(h.pipeline.handle_message(hello()).await);
    assert_eq!(summary.messages_sent, 0);
    assert!(h.platform.sent_texts().await.is_empty());
}

#[tokio::test]
async fn never_threads_when_probability_is_zero() {
    let mut s = settings(false);
    s.reply_probability = 0.0;
    let h = harness_with(s, false).await;
    h.provider
        .push_reply(r#"{"favorabilityChange": 0, "response": "hey"}"#)
        .await;

    dispatched(h.pipeline.handle_message(hello()).await);
    assert_eq!(h.platform.sends().await, vec![("hey".to_string(), None)]);
}

#[tokio::test]
async fn failed_reaction_does_not_block_text() {
    let h = harness().await;
    h.platform.fail_reactions(true);
    h.provider
        .push_reply(r#"{"favorabilityChange": 0, "response": "still here", "reaction": "🙃"}"#)
        .await;

    let summary = dispatched(h.pipeline.handle_message(hello()).await);
    assert!(!summary.reacted);
    assert_eq!(h.platform.sent_texts().await, vec!["still here"]);
}

#[tokio::test]
async fn history_is_cut_at_authors_reset() {
    let h = harness().await;
    let msg = hello();
    h.platform
        .set_history(
            &ChannelId::from(CHANNEL),
            vec![
                fixtures::history_of(&msg),
                fixtures::history("m0", "user-2", "Bob", "welcome back"),
                fixtures::history("m-1", "user-1", "Alice", "!reset all"),
                fixtures::history("m-2", "user-2", "Bob", "secret from before"),
            ],
        )
        .await;
    h.provider.push_reply(r#"{"favorabilityChange": 0}"#).await;

    h.pipeline.handle_message(msg).await;
    let prompt = &h.provider.prompts().await[0];
    assert!(prompt.contains("The recent chat history is:\nBob: welcome back\nAlice: hello\n\n"));
    assert!(!prompt.contains("secret from before"));
}

#[tokio::test]
async fn memories_and_score_reach_the_prompt() {
    let h = harness().await;
    h.store.set(&alice(), 12.0).await;
    h.store.add_memory(&alice(), "We watched a movie.").await;
    h.provider.push_reply(r#"{"favorabilityChange": 0}"#).await;

    h.pipeline.handle_message(hello()).await;
    let prompt = &h.provider.prompts().await[0];
    assert!(prompt.contains("(favorability score: 12) means: My relationship with them is very positive (close friend)."));
    assert!(prompt.contains("- We watched a movie.\n"));
}

#[tokio::test]
async fn link_title_replaces_url() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/article"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"<html><head><meta property="og:title" content="Rust 2024 released"></head></html>"#,
        ))
        .mount(&server)
        .await;

    let h = harness().await;
    let msg = fixtures::message(
        "m1",
        "user-1",
        "Alice",
        &format!("look {}/article", server.uri()),
    );
    h.platform
        .set_history(&ChannelId::from(CHANNEL), vec![fixtures::history_of(&msg)])
        .await;
    h.provider.push_reply(r#"{"favorabilityChange": 0}"#).await;

    h.pipeline.handle_message(msg).await;
    let prompt = &h.provider.prompts().await[0];
    assert!(prompt.contains("Alice: [The user sent a link with the title: \"Rust 2024 released\"]"));
}

#[tokio::test]
async fn unreachable_link_gets_generic_placeholder() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let h = harness().await;
    let msg = fixtures::message("m1", "user-1", "Alice", &format!("{}/gone", server.uri()));
    h.platform
        .set_history(&ChannelId::from(CHANNEL), vec![fixtures::history_of(&msg)])
        .await;
    h.provider.push_reply(r#"{"favorabilityChange": 0}"#).await;

    h.pipeline.handle_message(msg).await;
    assert!(h.provider.prompts().await[0]
        .contains("[The user sent a link, but I couldn't fetch its details.]"));
}

#[tokio::test]
async fn image_is_sent_inline() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/cat.png"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0x89, b'P', b'N', b'G']))
        .mount(&server)
        .await;

    let h = harness_with(settings(true), false).await;
    let mut msg = hello();
    msg.content = "my cat".into();
    msg.attachments.push(Attachment {
        url: format!("{}/cat.png", server.uri()),
        content_type: Some("image/png".into()),
    });
    h.provider.push_reply(r#"{"shouldRespond": true}"#).await;
    h.provider.push_reply(r#"{"favorabilityChange": 1}"#).await;

    h.pipeline.handle_message(msg).await;
    let calls = h.provider.calls().await;
    assert_eq!(calls.len(), 2);
    for call in &calls {
        assert_eq!(call.media.len(), 1);
        assert_eq!(call.media[0].mime_type, "image/png");
        assert_eq!(call.media[0].data, "iVBORw==");
    }
    assert!(calls[0].prompt.contains("[The user sent an image and also said: \"my cat\"]"));
}

#[tokio::test]
async fn admin_commands_bypass_the_model() {
    let h = harness().await;
    h.store.set(&alice(), 3.0).await;

    let outcome = h
        .pipeline
        .handle_message(fixtures::message("m1", "user-1", "Alice", "!reset all"))
        .await;
    assert_eq!(outcome, TurnOutcome::Admin);
    assert_eq!(
        h.platform.sent_texts().await,
        vec!["You do not have permission to use this command."]
    );
    assert_eq!(h.store.favorability(&alice()).await, 3.0);

    h.pipeline
        .handle_message(fixtures::message("m2", OWNER, "Owner", "!reset all"))
        .await;
    assert_eq!(h.store.favorability(&alice()).await, 0.0);
    assert_eq!(h.provider.call_count().await, 0);
}

#[tokio::test]
async fn owner_can_set_favorability() {
    let h = harness().await;
    h.platform.set_user_name(&alice(), "Alice").await;

    h.pipeline
        .handle_message(fixtures::message("m1", OWNER, "Owner", "!setfavor <@user-1> 7.5"))
        .await;
    h.pipeline
        .handle_message(fixtures::message("m2", OWNER, "Owner", "!setfavor <@123> 7.5"))
        .await;
    h.platform.set_user_name(&UserId::from("123"), "Carol").await;
    h.pipeline
        .handle_message(fixtures::message("m3", OWNER, "Owner", "!setfavor <@!123> 7.5"))
        .await;

    assert_eq!(
        h.platform.sent_texts().await,
        vec![
            "Invalid user. Please provide a user mention or a user ID.",
            "Could not find that user.",
            "Favorability for Carol has been set to 7.5.",
        ]
    );
    assert_eq!(h.store.favorability(&UserId::from("123")).await, 7.5);
}

fn reaction_on(author: Author, emoji: &str) -> ReactionEvent {
    ReactionEvent {
        user: Author::new("user-1", "Alice"),
        emoji: emoji.into(),
        channel_id: ChannelId::from(CHANNEL),
        message: persona_core::HistoryMessage {
            id: MessageId::from("bot-msg"),
            author,
            content: "good morning".into(),
            mentions: Default::default(),
        },
    }
}

fn me() -> Author {
    let mut me = Author::new("bot-1", "Mika");
    me.bot = true;
    me
}

#[tokio::test]
async fn reaction_on_own_message_gets_an_answer() {
    let h = harness().await;
    h.provider
        .push_reply(r#"{"shouldRespond": true, "response": "glad you liked it", "favorabilityChange": 0.3}"#)
        .await;

    let summary = dispatched(h.pipeline.handle_reaction(reaction_on(me(), "❤️")).await);
    assert_eq!(summary.messages_sent, 1);
    assert_eq!(
        h.platform.sends().await,
        vec![("<@user-1> glad you liked it".to_string(), None)]
    );
    assert_eq!(h.store.favorability(&alice()).await, 0.3);
    assert!(h.provider.prompts().await[0].contains("with the emoji: ❤️."));
}

#[tokio::test]
async fn declined_reaction_still_moves_favorability() {
    let h = harness().await;
    h.provider
        .push_reply(r#"{"shouldRespond": false, "response": "", "favorabilityChange": -0.5}"#)
        .await;

    let summary = dispatched(h.pipeline.handle_reaction(reaction_on(me(), "👎")).await);
    assert_eq!(summary.messages_sent, 0);
    assert_eq!(h.store.favorability(&alice()).await, -0.5);
}

#[tokio::test]
async fn reactions_on_other_messages_are_ignored() {
    let h = harness().await;
    let outcome = h
        .pipeline
        .handle_reaction(reaction_on(Author::new("user-2", "Bob"), "😂"))
        .await;
    assert_eq!(outcome, TurnOutcome::Ignored);

    let mut from_bot = reaction_on(me(), "😂");
    from_bot.user.bot = true;
    assert_eq!(h.pipeline.handle_reaction(from_bot).await, TurnOutcome::Ignored);
    assert_eq!(h.provider.call_count().await, 0);
}

fn guild() -> GuildId {
    GuildId::from(GUILD)
}

#[tokio::test]
async fn join_request_connects_after_sending_text() {
    let h = harness_with(settings(false), true).await;
    let voice_channel = ChannelId::from("vc-1");
    h.platform.put_in_voice(&guild(), &alice(), &voice_channel).await;
    h.provider
        .push_reply(r#"{"favorabilityChange": 0.1, "response": "on my way", "action": "JOIN_VC", "voiceResponse": "hello voice"}"#)
        .await;

    let summary = dispatched(h.pipeline.handle_message(hello()).await);
    assert_eq!(summary.voice, Some(VoiceAction::Join));

    let prompt = &h.provider.prompts().await[0];
    assert!(prompt.contains("'action': 'JOIN_VC'"));

    let voice = h.voice.as_ref().unwrap();
    assert_eq!(
        h.platform.sends().await,
        vec![("on my way".to_string(), Some(MessageId::from("m1")))]
    );
    assert!(voice.manager.is_connected(&guild()));
    assert_eq!(voice.synthesizer.spoken_texts().await, vec!["hello voice"]);
}

#[tokio::test]
async fn unperformable_join_falls_through_to_text() {
    let h = harness_with(settings(false), true).await;
    h.provider
        .push_reply(r#"{"favorabilityChange": 0, "response": "can't see you", "action": "JOIN_VC"}"#)
        .await;

    let summary = dispatched(h.pipeline.handle_message(hello()).await);
    assert_eq!(summary.voice, None);
    assert_eq!(h.platform.sent_texts().await, vec!["can't see you"]);
    assert!(h.voice.as_ref().unwrap().gateway.calls().await.is_empty());
}

#[tokio::test]
async fn failed_join_sends_fallback_line() {
    let h = harness_with(settings(false), true).await;
    h.platform
        .put_in_voice(&guild(), &alice(), &ChannelId::from("vc-1"))
        .await;
    h.voice.as_ref().unwrap().gateway.fail_join(true);
    h.provider
        .push_reply(r#"{"favorabilityChange": 0, "action": "JOIN_VC"}"#)
        .await;

    let summary = dispatched(h.pipeline.handle_message(hello()).await);
    assert_eq!(summary.voice, None);
    assert_eq!(
        h.platform.sent_texts().await,
        vec![VoiceConfig::default().join_failure]
    );
}

#[tokio::test]
async fn leave_request_says_goodbye_and_disconnects() {
    let h = harness_with(settings(false), true).await;
    let voice = h.voice.as_ref().unwrap();
    voice
        .manager
        .join(&guild(), &ChannelId::from("vc-1"), Some("hi"))
        .await
        .unwrap();
    h.provider
        .push_reply(r#"{"favorabilityChange": 0, "action": "LEAVE_VC"}"#)
        .await;

    let summary = dispatched(h.pipeline.handle_message(hello()).await);
    assert_eq!(summary.voice, Some(VoiceAction::Leave));
    assert!(h.provider.prompts().await[0].contains("'action': 'LEAVE_VC'"));
    assert!(!voice.manager.is_connected(&guild()));
    assert!(voice.gateway.calls().await.contains(&VoiceCall::Leave(guild())));
    assert_eq!(
        voice.synthesizer.spoken_texts().await.last().unwrap(),
        &VoiceConfig::default().farewell
    );
}

#[tokio::test]
async fn reply_is_spoken_when_sharing_a_voice_channel() {
    let h = harness_with(settings(false), true).await;
    let voice = h.voice.as_ref().unwrap();
    let voice_channel = ChannelId::from("vc-1");
    voice
        .manager
        .join(&guild(), &voice_channel, Some("hi"))
        .await
        .unwrap();
    h.platform.put_in_voice(&guild(), &alice(), &voice_channel).await;
    h.provider
        .push_reply(r#"{"favorabilityChange": 0, "response": "I hear you[PAUSE]loud and clear"}"#)
        .await;

    let summary = dispatched(h.pipeline.handle_message(hello()).await);
    assert!(summary.spoke);
    assert!(h.platform.sent_texts().await.is_empty());
    assert_eq!(
        voice.synthesizer.spoken_texts().await.last().unwrap(),
        "I hear you loud and clear"
    );
}
