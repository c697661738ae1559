pub mod client;
pub mod logout;
pub mod server;
pub mod watch;

// The match over `Action` lives in `run` so this module only declares them.
mod run;

#[derive(Debug)]
pub enum Action {
    Server(server::Args),
    Watch(watch::Args),
    Logout(logout::Args),
}

impl Action {
    /// Execute the action.
    /// # Errors
    /// Returns an error if the action fails.
    pub async fn execute(self) -> anyhow::Result<()> {
        run::execute(self).await
    }
}
