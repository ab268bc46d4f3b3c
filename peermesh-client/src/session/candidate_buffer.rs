use peermesh_core::IceCandidate;

/// Remote candidates that arrived before the connection had a remote
/// description. Opened once, when the remote description is being applied.
#[derive(Debug, Default)]
pub struct CandidateBuffer {
    pending: Vec<IceCandidate>,
    open: bool,
}

impl CandidateBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the candidate back when it can be applied right away,
    /// otherwise keeps it.
    pub fn push(&mut self, candidate: IceCandidate) -> Option<IceCandidate> {
        if self.open {
            return Some(candidate);
        }
        self.pending.push(candidate);
        None
    }

    /// Open the buffer, yielding what it held in arrival order.
    /// Later calls yield nothing.
    pub fn open(&mut self) -> Vec<IceCandidate> {
        self.open = true;
        std::mem::take(&mut self.pending)
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}
