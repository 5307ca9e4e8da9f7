#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::rc::Rc;

    use crate::config::*;
    use crate::conversation::*;
    use crate::error::*;
    use crate::event::*;
    use crate::message::*;

    // ─── Message Tests ───────────────────────────────────────

    #[test]
    fn test_message_user() {
        let msg = Message::user("Hello");
        assert!(msg.is_user);
        assert_eq!(msg.content, "Hello");
        assert!(!msg.is_streaming);
        assert!(!msg.is_open());
    }

    #[test]
    fn test_message_placeholder() {
        let msg = Message::placeholder();
        assert!(!msg.is_user);
        assert!(msg.content.is_empty());
        assert!(msg.is_streaming);
        assert!(msg.is_open());
    }

    #[test]
    fn test_message_ids_are_distinct() {
        let a = Message::user("a");
        let b = Message::user("a");
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_message_builders() {
        let file = Attachment::new("notes.txt", 2048, "text/plain");
        let msg = Message::user("see attached")
            .with_files(vec![file.clone()])
            .with_image_urls(vec!["https://example.com/a.png".to_string()]);
        assert_eq!(msg.files, vec![file]);
        assert_eq!(msg.image_urls.len(), 1);
    }

    #[test]
    fn test_message_serialization_skips_empty_lists() {
        let msg = Message::user("hi");
        let json = serde_json::to_string(&msg).unwrap();
        assert!(!json.contains("files"));
        assert!(!json.contains("image_urls"));
        assert!(json.contains(r#""is_user":true"#));
    }

    #[test]
    fn test_message_id_is_transparent() {
        let id = MessageId::from("m-1");
        assert_eq!(serde_json::to_string(&id).unwrap(), r#""m-1""#);
        assert_eq!(id.to_string(), "m-1");
    }

    // ─── Attachment Tests ────────────────────────────────────

    #[test]
    fn test_attachment_kind_from_mime() {
        assert_eq!(AttachmentKind::from_mime("image/png"), AttachmentKind::Image);
        assert_eq!(AttachmentKind::from_mime("IMAGE/JPEG"), AttachmentKind::Image);
        assert_eq!(AttachmentKind::from_mime("application/pdf"), AttachmentKind::Other);
        assert_eq!(AttachmentKind::from_mime(""), AttachmentKind::Other);
    }

    #[test]
    fn test_attachment_size_kb_rounds() {
        assert_eq!(Attachment::new("a", 0, "").size_kb(), 0);
        assert_eq!(Attachment::new("a", 511, "").size_kb(), 0);
        assert_eq!(Attachment::new("a", 512, "").size_kb(), 1);
        assert_eq!(Attachment::new("a", 1536, "").size_kb(), 2);
    }

    // ─── Conversation Tests ──────────────────────────────────

    #[test]
    fn test_conversation_new_is_empty() {
        let conv = Conversation::new(ConversationId::from_millis(42), "对话 1");
        assert_eq!(conv.id.as_str(), "42");
        assert_eq!(conv.title, "对话 1");
        assert!(conv.messages.is_empty());
        assert!(!conv.is_streaming());
    }

    #[test]
    fn test_conversation_streaming_message() {
        let mut conv = Conversation::new(ConversationId::from_millis(1), "t");
        let placeholder = Message::placeholder();
        let placeholder_id = placeholder.id.clone();
        conv.messages.push(Rc::new(Message::user("q")));
        conv.messages.push(Rc::new(placeholder));

        assert!(conv.is_streaming());
        assert_eq!(conv.streaming_message().unwrap().id, placeholder_id);
        assert!(conv.message(&placeholder_id).is_some());
        assert!(conv.message(&MessageId::from("missing")).is_none());

        let summary = conv.summary();
        assert_eq!(summary.message_count, 2);
        assert!(summary.is_streaming);
    }

    #[test]
    fn test_default_title() {
        assert_eq!(default_title(1), "对话 1");
        assert_eq!(default_title(12), "对话 12");
    }

    // ─── Event Tests ─────────────────────────────────────────

    #[test]
    fn test_event_touches_store() {
        let created = ChatEvent::ConversationCreated {
            conversation_id: ConversationId::from("1"),
        };
        assert!(created.touches_store());

        let upload = ChatEvent::UploadFinished { urls: vec![], failures: vec![] };
        assert!(!upload.touches_store());

        let err = ChatEvent::Error { message: "boom".to_string() };
        assert!(!err.touches_store());
    }

    #[test]
    fn test_stream_finished_serialization() {
        let event = ChatEvent::StreamFinished {
            conversation_id: ConversationId::from("c1"),
            message_id: MessageId::from("m1"),
            outcome: StreamOutcome::Failed { reason: "HTTP 500".to_string() },
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("StreamFinished"));
        assert!(json.contains("HTTP 500"));
    }

    // ─── Config Tests ────────────────────────────────────────

    #[test]
    fn test_default_config() {
        let config = ChatConfig::default();
        assert_eq!(config.chat.api_base, "https://api.coze.cn");
        assert!(config.chat.token.is_empty());
        assert_eq!(config.content_store.owner, "LivingRoomcode");
        assert_eq!(config.content_store.repo, "llmImage");
        assert_eq!(config.content_store.branch, "main");
        assert_eq!(config.content_store.directory, "images");
    }

    #[test]
    fn test_config_from_lookup_overrides_and_defaults() {
        let mut vars = HashMap::new();
        vars.insert("COZE_API_TOKEN", "pat_123");
        vars.insert("COZE_BOT_ID", "7400");
        vars.insert("GITHUB_OWNER", "someone");
        vars.insert("GITHUB_BRANCH", "   ");

        let config = ChatConfig::from_lookup(|k| vars.get(k).map(|v| v.to_string()));
        assert_eq!(config.chat.token, "pat_123");
        assert_eq!(config.chat.bot_id, "7400");
        assert_eq!(config.chat.user_id, "web-user");
        assert_eq!(config.content_store.owner, "someone");
        // Blank values fall back to the default
        assert_eq!(config.content_store.branch, "main");
    }

    #[test]
    fn test_config_validate_lists_missing_keys() {
        let err = ChatConfig::default().validate().unwrap_err();
        let text = err.to_string();
        assert!(text.contains("COZE_API_TOKEN"));
        assert!(text.contains("COZE_BOT_ID"));
        assert!(text.contains("GITHUB_ACCESS_TOKEN"));

        let mut config = ChatConfig::default();
        config.chat.token = "t".to_string();
        config.chat.bot_id = "b".to_string();
        config.content_store.token = "g".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_chat_url_trims_trailing_slash() {
        let mut chat = CozeConfig::default();
        chat.api_base = "https://api.coze.com/".to_string();
        assert_eq!(chat.chat_url(), "https://api.coze.com/v3/chat");
    }

    #[test]
    fn test_object_path() {
        let mut store = ContentStoreConfig::default();
        assert_eq!(store.object_path("a.png"), "images/a.png");
        store.directory = "/uploads/".to_string();
        assert_eq!(store.object_path("a.png"), "uploads/a.png");
        store.directory = String::new();
        assert_eq!(store.object_path("a.png"), "a.png");
    }

    #[test]
    fn test_config_serialization_roundtrip() {
        let config = ChatConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let back: ChatConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, config);
    }

    // ─── Error Tests ─────────────────────────────────────────

    #[test]
    fn test_error_display() {
        let err = ChatError::Http { status: 404, message: "Not Found".to_string() };
        assert_eq!(err.to_string(), "HTTP 404: Not Found");

        let err = ChatError::ReadFailed {
            name: "a.png".to_string(),
            message: "denied".to_string(),
        };
        assert_eq!(err.to_string(), "Read failed: a.png: denied");

        let err = ChatError::VersionConflict { path: "images/a.png".to_string() };
        assert!(err.to_string().contains("images/a.png"));
    }

    #[test]
    fn test_error_is_transport() {
        assert!(ChatError::Network("offline".to_string()).is_transport());
        assert!(ChatError::Http { status: 500, message: String::new() }.is_transport());
        assert!(!ChatError::ReadFailed { name: "a".into(), message: "b".into() }.is_transport());
        assert!(!ChatError::VersionConflict { path: "p".into() }.is_transport());
    }

    #[test]
    fn test_error_from_serde() {
        let serde_err = serde_json::from_str::<serde_json::Value>("{{invalid}}").unwrap_err();
        let err: ChatError = serde_err.into();
        assert!(matches!(err, ChatError::Serialization(_)));
    }

    #[test]
    fn test_upload_failure_display() {
        let failure = UploadFailure {
            file_name: "a.png".to_string(),
            error: ChatError::Network("offline".to_string()),
        };
        assert_eq!(failure.to_string(), "a.png: Network error: offline");
    }
}
