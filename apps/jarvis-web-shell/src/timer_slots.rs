use jarvis_client_core::TimerToken;

/// Owns the handle of the one live timeout, keyed by its token.
///
/// A replaced handle is parked until the next `schedule`, because the caller may be
/// running inside that handle's own callback.
#[derive(Debug)]
pub(crate) struct TimerSlots<H> {
    pending: Option<(TimerToken, H)>,
    retired: Vec<H>,
}

impl<H> Default for TimerSlots<H> {
    fn default() -> Self {
        Self {
            pending: None,
            retired: Vec::new(),
        }
    }
}

impl<H> TimerSlots<H> {
    pub(crate) fn schedule(&mut self, token: TimerToken, handle: H) {
        self.retired.clear();
        if let Some((_, previous)) = self.pending.replace((token, handle)) {
            self.retired.push(previous);
        }
    }

    /// Hands back the handle for `token` so the caller can drop it. Other tokens are ignored.
    pub(crate) fn cancel(&mut self, token: TimerToken) -> Option<H> {
        match self.pending.take() {
            Some((pending, handle)) if pending == token => Some(handle),
            other => {
                self.pending = other;
                None
            }
        }
    }

    pub(crate) fn pending_token(&self) -> Option<TimerToken> {
        self.pending.as_ref().map(|(token, _)| *token)
    }

    pub(crate) fn held(&self) -> usize {
        self.retired.len() + usize::from(self.pending.is_some())
    }
}
