mod close;
mod lock;
mod next_prompt;
mod presets;
mod run;
mod spawn;
mod status;

pub use close::Close;
pub use lock::{Lock, Unlock};
pub use next_prompt::NextPrompt;
pub use presets::{SpawnBash, SpawnR, SpawnRoot};
pub use run::Run;
pub use spawn::Spawn;
pub use status::Status;
