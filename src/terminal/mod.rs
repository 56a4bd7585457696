//! Terminal front end
//!
//! Renders the transcript line by line and streams replies as they arrive.
//! Reading input and writing output are kept generic so the loop can run
//! against in-memory buffers.

use std::io::{self, Write};

use chrono::Local;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

use crate::config::prompts::{ASSISTANT_NAME, DISCLAIMER};
use crate::conversation::{Conversation, Message, Speaker};
use crate::core::{ChatEngine, ChatError, ReplyEvent, ReplyObserver, SendState};

const CLEAR_LINE: &str = "\r\x1b[2K";

pub struct TerminalRenderer<W: Write> {
    out: W,
    typing: bool,
    streamed: String,
}

impl<W: Write> TerminalRenderer<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            typing: false,
            streamed: String::new(),
        }
    }

    pub fn header(&mut self) -> io::Result<()> {
        writeln!(self.out, "♥ {}", ASSISTANT_NAME)?;
        writeln!(self.out, "● Health Assistant Online")?;
        writeln!(self.out, "{}", "─".repeat(40))
    }

    pub fn transcript(&mut self, conversation: &Conversation) -> io::Result<()> {
        for message in conversation.messages() {
            self.message(message)?;
        }
        Ok(())
    }

    pub fn message(&mut self, message: &Message) -> io::Result<()> {
        writeln!(self.out, "{}{}", label(message), message.text())?;
        writeln!(self.out)
    }

    pub fn footer(&mut self) -> io::Result<()> {
        writeln!(self.out, "{}", DISCLAIMER)?;
        writeln!(self.out, "Type /quit to leave.")?;
        writeln!(self.out)
    }

    pub fn prompt(&mut self) -> io::Result<()> {
        write!(self.out, "> ")?;
        self.out.flush()
    }

    fn render(&mut self, event: ReplyEvent<'_>) -> io::Result<()> {
        match event {
            ReplyEvent::State(SendState::Sending) => {
                self.streamed.clear();
                self.typing = true;
                write!(self.out, "{} is typing…", ASSISTANT_NAME)?;
            }
            ReplyEvent::State(SendState::Streaming) => {
                self.clear_typing()?;
                write!(self.out, "{}", assistant_label(Local::now()))?;
            }
            ReplyEvent::State(_) => {}
            ReplyEvent::Fragment(text) => {
                self.streamed.push_str(text);
                write!(self.out, "{}", text)?;
            }
            ReplyEvent::Finalized(message) => {
                if self.typing {
                    // Nothing was streamed; print the whole turn.
                    self.clear_typing()?;
                    self.message(message)?;
                } else if message.text() == self.streamed {
                    writeln!(self.out)?;
                    writeln!(self.out)?;
                } else {
                    writeln!(self.out)?;
                    self.message(message)?;
                }
                self.streamed.clear();
            }
        }
        self.out.flush()
    }

    fn clear_typing(&mut self) -> io::Result<()> {
        if self.typing {
            self.typing = false;
            write!(self.out, "{}", CLEAR_LINE)?;
        }
        Ok(())
    }
}

impl<W: Write> ReplyObserver for TerminalRenderer<W> {
    fn on_event(&mut self, event: ReplyEvent<'_>) {
        if let Err(e) = self.render(event) {
            tracing::warn!("Failed to write to terminal: {}", e);
        }
    }
}

fn label(message: &Message) -> String {
    let time = message.created_at().with_timezone(&Local);
    match message.speaker() {
        Speaker::User => format!("[{}] You: ", time.format("%H:%M")),
        Speaker::Assistant => assistant_label(time),
    }
}

fn assistant_label(time: chrono::DateTime<Local>) -> String {
    format!("[{}] {}: ", time.format("%H:%M"), ASSISTANT_NAME)
}

/// Run an interactive session until `/quit`, `/exit` or end of input
pub async fn run<R, W>(engine: &mut ChatEngine, input: R, output: W) -> anyhow::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    let mut renderer = TerminalRenderer::new(output);
    renderer.header()?;
    renderer.transcript(engine.conversation())?;
    renderer.footer()?;

    let mut lines = input.lines();
    loop {
        renderer.prompt()?;
        let Some(line) = lines.next_line().await? else {
            break;
        };
        if matches!(line.trim(), "/quit" | "/exit") {
            break;
        }

        match engine.send(&line, &mut renderer).await {
            Ok(outcome) => tracing::debug!(?outcome, "Send finished"),
            Err(ChatError::Rejected(e)) => tracing::debug!("Input ignored: {}", e),
        }
    }

    writeln!(renderer.out)?;
    tracing::info!(
        conversation = %engine.conversation().id(),
        messages = engine.conversation().len(),
        "Session ended"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::prompts::{APOLOGY, WELCOME};
    use crate::providers::scripted::{Script, ScriptedBackend};
    use std::sync::Arc;
    use tokio::io::BufReader;
    use tokio_test::io::Builder;

    fn engine(scripts: Vec<Script>) -> (ChatEngine, Arc<ScriptedBackend>) {
        let backend = Arc::new(ScriptedBackend::new(scripts));
        (ChatEngine::new(backend.clone(), None), backend)
    }

    async fn session(engine: &mut ChatEngine, input: &[u8]) -> String {
        let input = BufReader::new(Builder::new().read(input).build());
        let mut output = Vec::new();
        run(engine, input, &mut output).await.unwrap();
        String::from_utf8(output).unwrap()
    }

    #[tokio::test]
    async fn test_session_streams_reply() {
        let (mut engine, _) = engine(vec![Script::Reply(vec!["Stay ", "hydrated."])]);

        let output = session(&mut engine, b"I have a cough\n/quit\n").await;

        assert!(output.contains(WELCOME));
        assert!(output.contains(DISCLAIMER));
        assert!(output.contains("Cretcom is typing…"));
        assert!(output.contains("Stay hydrated."));
        assert_eq!(engine.conversation().len(), 3);
        assert_eq!(engine.conversation().messages()[1].text(), "I have a cough");
    }

    #[tokio::test]
    async fn test_session_shows_apology_on_failure() {
        let (mut engine, _) = engine(vec![Script::FailAfter(vec!["Par"])]);

        let output = session(&mut engine, b"fever\n").await;

        assert!(output.contains("Par"));
        assert!(output.contains(APOLOGY));
        assert_eq!(engine.conversation().messages()[2].text(), APOLOGY);
    }

    #[tokio::test]
    async fn test_blank_lines_are_ignored() {
        let (mut engine, backend) = engine(vec![]);

        session(&mut engine, b"\n   \n/exit\n").await;

        assert_eq!(engine.conversation().len(), 1);
        assert!(backend.requests().is_empty());
    }

    #[test]
    fn test_unstreamed_reply_is_printed_whole() {
        let mut conversation = Conversation::new();
        let id = conversation.begin_assistant_reply().unwrap();
        conversation
            .finalize(id, crate::conversation::Finish::Fallback(APOLOGY.to_string()))
            .unwrap();

        let mut output = Vec::new();
        let mut renderer = TerminalRenderer::new(&mut output);
        renderer.on_event(ReplyEvent::State(SendState::Sending));
        renderer.on_event(ReplyEvent::State(SendState::Failed));
        renderer.on_event(ReplyEvent::Finalized(conversation.get(id).unwrap()));

        let output = String::from_utf8(output).unwrap();
        assert!(output.contains(CLEAR_LINE));
        assert!(output.ends_with(&format!("{}\n\n", APOLOGY)));
    }
}
