use crate::store::{CPU_KIND, HEAP_KIND};

/// A committed prompt command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Switch to another profile kind
    Kind(String),
    Refresh,
    ToggleSort,
    /// Set the filter; empty clears it
    Filter(String),
    /// Jump to a page, counted from 1
    Page(usize),
}

impl Command {
    /// Parse the text typed after `:`
    pub fn parse(text: &str) -> Option<Command> {
        match text {
            "c" => return Some(Command::Kind(CPU_KIND.to_string())),
            "h" => return Some(Command::Kind(HEAP_KIND.to_string())),
            "r" => return Some(Command::Refresh),
            "s" => return Some(Command::ToggleSort),
            _ => {}
        }

        let (verb, arg) = text.split_once('=')?;
        match verb {
            "f" => Some(Command::Filter(arg.to_string())),
            "k" if !arg.is_empty() => Some(Command::Kind(arg.to_string())),
            "p" => arg.trim().parse().ok().map(Command::Page),
            _ => None,
        }
    }
}

/// Prompt state: idle, or composing the text after `:`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandBuffer {
    text: Option<String>,
}

impl CommandBuffer {
    pub fn is_composing(&self) -> bool {
        self.text.is_some()
    }

    pub fn start(&mut self) {
        self.text = Some(String::new());
    }

    pub fn push(&mut self, c: char) {
        if let Some(text) = self.text.as_mut() {
            text.push(c);
        }
    }

    pub fn pop(&mut self) {
        if let Some(text) = self.text.as_mut() {
            text.pop();
        }
    }

    pub fn cancel(&mut self) {
        self.text = None;
    }

    /// Return to idle, yielding the composed text
    pub fn commit(&mut self) -> Option<String> {
        self.text.take()
    }

    /// Prompt line as displayed, empty when idle
    pub fn prompt(&self) -> String {
        match &self.text {
            Some(text) => format!(":{}", text),
            None => String::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_verbs() {
        assert_eq!(Command::parse("c"), Some(Command::Kind("profile".into())));
        assert_eq!(Command::parse("h"), Some(Command::Kind("heap".into())));
        assert_eq!(Command::parse("k=goroutine"), Some(Command::Kind("goroutine".into())));
        assert_eq!(Command::parse("r"), Some(Command::Refresh));
        assert_eq!(Command::parse("s"), Some(Command::ToggleSort));
        assert_eq!(Command::parse("f=main\\..*"), Some(Command::Filter("main\\..*".into())));
        assert_eq!(Command::parse("f="), Some(Command::Filter(String::new())));
        assert_eq!(Command::parse("p=3"), Some(Command::Page(3)));
    }

    #[test]
    fn test_parse_rejects_unknown() {
        for text in ["", "x", "cc", "p=", "p=-1", "k=", "z=1", "f"] {
            assert_eq!(Command::parse(text), None, "{:?}", text);
        }
    }

    #[test]
    fn test_buffer_transitions() {
        let mut buf = CommandBuffer::default();
        buf.push('x');
        buf.pop();
        assert!(!buf.is_composing());
        assert_eq!(buf.prompt(), "");

        buf.start();
        buf.pop();
        assert_eq!(buf.prompt(), ":");
        buf.push('f');
        buf.push('=');
        buf.push('a');
        buf.pop();
        assert_eq!(buf.prompt(), ":f=");
        assert_eq!(buf.commit().as_deref(), Some("f="));
        assert!(!buf.is_composing());

        buf.start();
        buf.push('c');
        buf.cancel();
        assert_eq!(buf.commit(), None);
    }
}
