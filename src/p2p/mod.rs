// Copyright 2024 Janus Bridge Developers
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
// http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! # Peer-to-Peer Module
//!
//! The signature-broadcast layer. Relayers authenticate each other's
//! messages against the whitelist, gossip per-batch signatures on `sign/1`
//! and bootstrap late joiners on `join/1`.

mod broadcaster;
mod messages;
mod signatures;

pub use broadcaster::{
    Broadcaster, JoinRebroadcaster, MessageProcessor, NetMessenger, PeerId,
    SignatureStore,
};
pub use messages::{SignaturePayload, SignedMessage, JOIN_TOPIC, SIGN_TOPIC};
pub use signatures::SignatureHolder;
