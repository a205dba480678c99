//! Batches of independent commands sent in one round trip.
//!
//! The store runs each command on its own; nothing here is transactional.
//! What a batch guarantees is correlation: after `execute` succeeds, reply
//! `i` belongs to command `i`.

use super::command::Command;
use super::connection::{Connection, TransportError};
use super::reply::Reply;
use tracing::trace;

#[derive(Debug, Default)]
pub struct Batch {
    commands: Vec<Command>,
    replies: Vec<Reply>,
}

impl Batch {
    pub fn with_capacity(capacity: usize) -> Self {
        Batch {
            commands: Vec::with_capacity(capacity),
            replies: Vec::new(),
        }
    }

    pub fn push(&mut self, command: Command) {
        self.commands.push(command);
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    /// Send every queued command through `conn` as one pipeline.
    ///
    /// Replies from a previous run are discarded first, so after a failure
    /// `reply` returns `None` for every command.
    pub fn execute<C: Connection + ?Sized>(&mut self, conn: &C) -> Result<(), TransportError> {
        self.replies.clear();
        if self.commands.is_empty() {
            return Ok(());
        }

        trace!(commands = self.commands.len(), "executing pipeline");
        let replies = conn.pipeline(&self.commands)?;
        if replies.len() != self.commands.len() {
            return Err(TransportError::ReplyCount {
                expected: self.commands.len(),
                actual: replies.len(),
            });
        }

        self.replies = replies;
        Ok(())
    }

    /// Reply to the command at `index`, once the batch has executed.
    pub fn reply(&self, index: usize) -> Option<&Reply> {
        self.replies.get(index)
    }

    /// Commands paired with their replies, in submission order.
    pub fn iter(&self) -> impl Iterator<Item = (&Command, &Reply)> {
        self.commands.iter().zip(self.replies.iter())
    }

    pub fn executed(&self) -> bool {
        !self.commands.is_empty() && self.replies.len() == self.commands.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    /// Answers each command with its position, or with a canned reply list.
    struct Scripted {
        canned: Mutex<Option<Vec<Reply>>>,
        fail: bool,
    }

    impl Connection for Scripted {
        fn execute(&self, _command: &Command) -> Result<Reply, TransportError> {
            Ok(Reply::Nil)
        }

        fn pipeline(&self, commands: &[Command]) -> Result<Vec<Reply>, TransportError> {
            if self.fail {
                return Err(TransportError::Protocol("scripted failure".to_string()));
            }
            if let Some(canned) = self.canned.lock().take() {
                return Ok(canned);
            }
            Ok((0..commands.len() as i64).map(Reply::Integer).collect())
        }
    }

    fn batch_of(n: usize) -> Batch {
        let mut batch = Batch::with_capacity(n);
        for i in 0..n {
            batch.push(Command::new("INCR").str_arg(&format!("k{}", i)));
        }
        batch
    }

    #[test]
    fn test_replies_correlate_by_position() {
        let conn = Scripted { canned: Mutex::new(None), fail: false };
        let mut batch = batch_of(3);
        batch.execute(&conn).unwrap();
        assert!(batch.executed());
        for (i, (cmd, reply)) in batch.iter().enumerate() {
            assert_eq!(cmd.to_string(), format!("INCR k{}", i));
            assert_eq!(reply, &Reply::Integer(i as i64));
        }
    }

    #[test]
    fn test_transport_failure_leaves_no_replies() {
        let ok = Scripted { canned: Mutex::new(None), fail: false };
        let failing = Scripted { canned: Mutex::new(None), fail: true };
        let mut batch = batch_of(2);
        batch.execute(&ok).unwrap();
        assert!(batch.execute(&failing).is_err());
        assert!(batch.reply(0).is_none());
        assert!(!batch.executed());
    }

    #[test]
    fn test_short_reply_list_is_rejected() {
        let conn = Scripted {
            canned: Mutex::new(Some(vec![Reply::Integer(1)])),
            fail: false,
        };
        let mut batch = batch_of(2);
        match batch.execute(&conn) {
            Err(TransportError::ReplyCount { expected: 2, actual: 1 }) => {}
            other => panic!("expected reply count mismatch, got {:?}", other),
        }
        assert!(batch.reply(0).is_none());
    }

    #[test]
    fn test_empty_batch_is_a_no_op() {
        let conn = Scripted { canned: Mutex::new(None), fail: true };
        let mut batch = Batch::default();
        assert!(batch.execute(&conn).is_ok());
        assert!(!batch.executed());
    }
}
