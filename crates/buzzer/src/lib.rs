//! # Buzzer
//!
//! Server for a team buzzer trivia game played in the browser.
//!
//! A host opens a room and shares its four-character code; up to four
//! players join it on the red or blue team. Each round the host shows a
//! set of images, players race to buzz in, and the host judges the
//! answer. The server is the only arbiter of who buzzed first.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use buzzer::prelude::*;
//!
//! # async fn run() -> Result<(), BuzzerError> {
//! let server = BuzzerServer::builder()
//!     .bind("0.0.0.0:3000")
//!     .build()
//!     .await?;
//! server.run().await
//! # }
//! ```

mod error;
mod handler;
mod images;
mod server;

pub use error::BuzzerError;
pub use images::{ImageStore, NoImageStore, UploadDirStore};
pub use server::{BuzzerServer, BuzzerServerBuilder, DEFAULT_IDLE_TIMEOUT, DEFAULT_PING_INTERVAL};

/// Everything needed to run a server or talk to one in tests.
pub mod prelude {
    pub use crate::{
        BuzzerError, BuzzerServer, BuzzerServerBuilder, DEFAULT_IDLE_TIMEOUT,
        DEFAULT_PING_INTERVAL, ImageStore, NoImageStore, UploadDirStore,
    };
    pub use buzzer_protocol::{
        AckBody, CheckRoomAck, ClientEvent, Codec, CreateRoomAck, Envelope, ImageRef,
        JoinRoomAck, JsonCodec, PROTOCOL_VERSION, Payload, PlayerId, Request, RoomCode,
        RoomSnapshot, Scores, ServerEvent, Team,
    };
    pub use buzzer_room::{JoinError, RoomConfig};
}
