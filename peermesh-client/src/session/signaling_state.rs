use serde::Serialize;
use std::fmt;

/// Offer/answer progress with one remote peer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum NegotiationState {
    New,
    HaveLocalOffer,
    HaveRemoteOffer,
    Stable,
    Closed,
}

impl fmt::Display for NegotiationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match self {
            NegotiationState::New => "new",
            NegotiationState::HaveLocalOffer => "have-local-offer",
            NegotiationState::HaveRemoteOffer => "have-remote-offer",
            NegotiationState::Stable => "stable",
            NegotiationState::Closed => "closed",
        };
        f.write_str(state)
    }
}

/// What to do with an incoming offer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OfferDecision {
    Accept,
    /// Both sides offered and we are the polite side. Our connection already
    /// holds a local offer, so the answer comes from a fresh connection.
    Restart,
    /// A remote description is already set.
    IgnoreDuplicate,
    /// Both sides offered and we are the impolite side.
    IgnoreGlare,
    IgnoreClosed,
}

/// Per-peer negotiation state.
///
/// ```text
/// New --begin_offer/local_offer_created--> HaveLocalOffer --remote_answer--> Stable
/// New --remote_offer--> HaveRemoteOffer --local_answer_sent--> Stable
/// any --close--> Closed
/// ```
///
/// Glare: the polite side (smaller peer id) abandons its own offer and
/// answers on a new connection; the impolite side ignores the colliding offer.
#[derive(Debug)]
pub struct SignalingStateMachine {
    state: NegotiationState,
    making_offer: bool,
    remote_description: bool,
    polite: bool,
}

impl SignalingStateMachine {
    pub fn new(polite: bool) -> Self {
        Self {
            state: NegotiationState::New,
            making_offer: false,
            remote_description: false,
            polite,
        }
    }

    pub fn state(&self) -> NegotiationState {
        self.state
    }

    pub fn is_polite(&self) -> bool {
        self.polite
    }

    pub fn is_making_offer(&self) -> bool {
        self.making_offer
    }

    pub fn has_remote_description(&self) -> bool {
        self.remote_description
    }

    /// Reserve the right to offer. Only a fresh session may offer, once.
    pub fn begin_offer(&mut self) -> bool {
        if self.state != NegotiationState::New || self.making_offer {
            return false;
        }
        self.making_offer = true;
        true
    }

    /// The platform produced our offer. Returns `false` when the offer was
    /// abandoned in the meantime and must not be sent.
    pub fn local_offer_created(&mut self) -> bool {
        if self.state != NegotiationState::New || !self.making_offer {
            return false;
        }
        self.making_offer = false;
        self.state = NegotiationState::HaveLocalOffer;
        true
    }

    pub fn remote_offer(&mut self) -> OfferDecision {
        if self.state == NegotiationState::Closed {
            return OfferDecision::IgnoreClosed;
        }
        if self.remote_description {
            return OfferDecision::IgnoreDuplicate;
        }

        let collision = self.making_offer || self.state == NegotiationState::HaveLocalOffer;
        if collision {
            if !self.polite {
                return OfferDecision::IgnoreGlare;
            }
            self.close();
            return OfferDecision::Restart;
        }

        self.remote_description = true;
        self.state = NegotiationState::HaveRemoteOffer;
        OfferDecision::Accept
    }

    /// Returns `false` (and changes nothing) unless we are waiting for an answer.
    pub fn remote_answer(&mut self) -> bool {
        if self.state != NegotiationState::HaveLocalOffer || self.remote_description {
            return false;
        }
        self.remote_description = true;
        self.state = NegotiationState::Stable;
        true
    }

    pub fn local_answer_sent(&mut self) -> bool {
        if self.state != NegotiationState::HaveRemoteOffer {
            return false;
        }
        self.state = NegotiationState::Stable;
        true
    }

    pub fn close(&mut self) {
        self.making_offer = false;
        self.state = NegotiationState::Closed;
    }

    pub fn is_closed(&self) -> bool {
        self.state == NegotiationState::Closed
    }
}
