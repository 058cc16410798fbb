//! Test doubles for the injected collaborators.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};

use crate::connection::{Channel, ChannelId, Timer, TimerToken};
use crate::error::ChannelError;
use crate::session::Clock;

#[derive(Debug, Default)]
struct ChannelLog {
    opened: Vec<(String, ChannelId)>,
    sent: Vec<(ChannelId, String)>,
    closed: Vec<ChannelId>,
    fail_open: bool,
    fail_send: bool,
}

/// Records every call; clones share the same log.
#[derive(Debug, Clone, Default)]
pub struct RecordingChannel {
    log: Rc<RefCell<ChannelLog>>,
}

impl RecordingChannel {
    pub fn last_opened(&self) -> Option<ChannelId> {
        self.log.borrow().opened.last().map(|(_, id)| *id)
    }

    pub fn open_count(&self) -> usize {
        self.log.borrow().opened.len()
    }

    pub fn opened_urls(&self) -> Vec<String> {
        self.log
            .borrow()
            .opened
            .iter()
            .map(|(url, _)| url.clone())
            .collect()
    }

    pub fn sent(&self) -> Vec<(ChannelId, String)> {
        self.log.borrow().sent.clone()
    }

    pub fn sent_texts(&self) -> Vec<String> {
        self.log
            .borrow()
            .sent
            .iter()
            .map(|(_, text)| text.clone())
            .collect()
    }

    pub fn closed(&self) -> Vec<ChannelId> {
        self.log.borrow().closed.clone()
    }

    pub fn fail_opens(&self, fail: bool) {
        self.log.borrow_mut().fail_open = fail;
    }

    pub fn fail_sends(&self, fail: bool) {
        self.log.borrow_mut().fail_send = fail;
    }
}

impl Channel for RecordingChannel {
    fn open(&mut self, url: &str, id: ChannelId) -> Result<(), ChannelError> {
        let mut log = self.log.borrow_mut();
        log.opened.push((url.to_string(), id));
        if log.fail_open {
            return Err(ChannelError::Open("connection refused".to_string()));
        }
        Ok(())
    }

    fn send(&mut self, id: ChannelId, text: &str) -> Result<(), ChannelError> {
        let mut log = self.log.borrow_mut();
        if log.fail_send {
            return Err(ChannelError::Write("broken pipe".to_string()));
        }
        log.sent.push((id, text.to_string()));
        Ok(())
    }

    fn close(&mut self, id: ChannelId) {
        self.log.borrow_mut().closed.push(id);
    }
}

#[derive(Debug, Default)]
struct TimerLog {
    scheduled: Vec<(Duration, TimerToken)>,
    cancelled: Vec<TimerToken>,
}

/// Never fires on its own; tests deliver tokens by hand.
#[derive(Debug, Clone, Default)]
pub struct ManualTimer {
    log: Rc<RefCell<TimerLog>>,
}

impl ManualTimer {
    pub fn last_token(&self) -> Option<TimerToken> {
        self.log.borrow().scheduled.last().map(|(_, token)| *token)
    }

    pub fn scheduled_delays(&self) -> Vec<Duration> {
        self.log
            .borrow()
            .scheduled
            .iter()
            .map(|(delay, _)| *delay)
            .collect()
    }

    pub fn cancelled(&self) -> Vec<TimerToken> {
        self.log.borrow().cancelled.clone()
    }
}

impl Timer for ManualTimer {
    fn schedule(&mut self, delay: Duration, token: TimerToken) {
        self.log.borrow_mut().scheduled.push((delay, token));
    }

    fn cancel(&mut self, token: TimerToken) {
        self.log.borrow_mut().cancelled.push(token);
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Default for FixedClock {
    fn default() -> Self {
        Self(
            Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0)
                .single()
                .unwrap_or_default(),
        )
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}
