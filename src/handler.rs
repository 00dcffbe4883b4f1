//! Turns a role and a request into a printed completion

use eyre::Result;
use std::io::Write;

use crate::chat::{ChatSession, ChatStore};
use crate::client::{CompletionService, Generation, Message};
use crate::printer::StreamPrinter;
use crate::role::Role;

pub struct Handler<'a, W: Write> {
    service: &'a dyn CompletionService,
    generation: Generation,
    printer: StreamPrinter<W>,
}

impl<'a, W: Write> Handler<'a, W> {
    pub fn new(service: &'a dyn CompletionService, generation: Generation, printer: StreamPrinter<W>) -> Self {
        Self {
            service,
            generation,
            printer,
        }
    }

    /// Messages for a single, stateless exchange
    pub fn make_messages(role: &Role, request: &str) -> Vec<Message> {
        let mut messages = Vec::with_capacity(2);
        if !role.role.is_empty() {
            messages.push(role.system_message());
        }
        messages.push(Message::user(role.make_prompt(request, true)));
        messages
    }

    /// One-shot completion; returns the full reply
    pub fn handle(&mut self, role: &Role, request: &str) -> Result<String> {
        let messages = Self::make_messages(role, request);
        self.complete(&messages)
    }

    /// Completion within a persisted chat
    ///
    /// The chat is saved only after the reply has been received in full.
    pub fn handle_chat(
        &mut self,
        store: &ChatStore,
        session: &mut ChatSession,
        role: &Role,
        request: &str,
        cache_length: usize,
    ) -> Result<String> {
        session.prepare(role, request);
        let reply = self.complete(&session.messages)?;
        session.push_reply(reply.clone());
        session.truncate(cache_length);
        store.save(session)?;
        Ok(reply)
    }

    fn complete(&mut self, messages: &[Message]) -> Result<String> {
        log::debug!("Sending {} messages", messages.len());
        let fragments = self.service.complete(messages, &self.generation)?;
        self.printer.print(fragments)
    }

    #[cfg(test)]
    pub fn into_printer(self) -> StreamPrinter<W> {
        self.printer
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::client::{Fragments, MessageRole};
    use std::cell::RefCell;
    use tempfile::TempDir;

    /// Replays canned fragments and records what it was sent
    pub(crate) struct FakeService {
        pub(crate) replies: RefCell<Vec<Vec<&'static str>>>,
        pub(crate) fail_after: Option<usize>,
        pub(crate) seen: RefCell<Vec<Vec<Message>>>,
    }

    impl FakeService {
        pub(crate) fn new(replies: Vec<Vec<&'static str>>) -> Self {
            Self {
                replies: RefCell::new(replies),
                fail_after: None,
                seen: RefCell::new(Vec::new()),
            }
        }
    }

    impl CompletionService for FakeService {
        fn complete(&self, messages: &[Message], _generation: &Generation) -> Result<Fragments> {
            self.seen.borrow_mut().push(messages.to_vec());
            let reply = self.replies.borrow_mut().remove(0);
            let mut items: Vec<Result<String>> = reply.into_iter().map(|s| Ok(s.to_string())).collect();
            if let Some(n) = self.fail_after {
                items.truncate(n);
                items.push(Err(eyre::eyre!("stream interrupted")));
            }
            Ok(Box::new(items.into_iter()))
        }
    }

    fn generation() -> Generation {
        Generation {
            model: "test-model".to_string(),
            temperature: 0.0,
            top_p: 1.0,
            stream: true,
        }
    }

    fn shell_role() -> Role {
        Role::new("shell", "Only bash commands.", "Command", None)
    }

    #[test]
    fn test_handle_sends_system_and_initial_prompt() {
        let service = FakeService::new(vec![vec!["ls", " -la"]]);
        let mut handler = Handler::new(&service, generation(), StreamPrinter::new(Vec::new(), None, true));

        let reply = handler.handle(&shell_role(), "list all files").unwrap();
        assert_eq!(reply, "ls -la");

        let seen = service.seen.borrow();
        assert_eq!(seen[0].len(), 2);
        assert_eq!(seen[0][0].role, MessageRole::System);
        assert!(seen[0][1].content.contains("Role name: shell"));
        assert!(seen[0][1].content.ends_with("Command:"));

        let out = String::from_utf8(handler.into_printer().into_inner()).unwrap();
        assert_eq!(out, "ls -la\n");
    }

    #[test]
    fn test_empty_role_sends_only_user_turn() {
        let messages = Handler::<Vec<u8>>::make_messages(&Role::new("empty", "", "answer", None), "hi");
        assert_eq!(messages, vec![Message::user("hi\nanswer:")]);
    }

    #[test]
    fn test_handle_chat_persists_after_reply() {
        let temp = TempDir::new().unwrap();
        let store = ChatStore::new(temp.path());
        let service = FakeService::new(vec![vec!["ls"], vec!["ls -a"]]);
        let mut handler = Handler::new(&service, generation(), StreamPrinter::new(Vec::new(), None, true));

        let mut session = store.load_or_new("work").unwrap();
        handler.handle_chat(&store, &mut session, &shell_role(), "list files", 100).unwrap();
        let mut session = store.load("work").unwrap();
        assert_eq!(session.messages.len(), 3);

        handler.handle_chat(&store, &mut session, &shell_role(), "with hidden", 100).unwrap();
        let saved = store.load("work").unwrap();
        assert_eq!(saved.messages.len(), 5);
        assert_eq!(saved.messages[4], Message::assistant("ls -a"));

        // Second request carried the whole transcript
        assert_eq!(service.seen.borrow()[1].len(), 4);
    }

    #[test]
    fn test_handle_chat_failure_leaves_saved_chat_untouched() {
        let temp = TempDir::new().unwrap();
        let store = ChatStore::new(temp.path());
        let mut service = FakeService::new(vec![vec!["Hel", "lo"]]);
        service.fail_after = Some(1);
        let mut handler = Handler::new(&service, generation(), StreamPrinter::new(Vec::new(), None, true));

        let mut session = store.load_or_new("work").unwrap();
        let err = handler
            .handle_chat(&store, &mut session, &shell_role(), "list files", 100)
            .unwrap_err();
        assert_eq!(err.to_string(), "stream interrupted");
        assert!(store.load("work").is_err());

        let out = String::from_utf8(handler.into_printer().into_inner()).unwrap();
        assert_eq!(out, "Hel\n");
    }
}
