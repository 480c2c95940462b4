use std::fmt;

use crate::client::{segment, Client};
use crate::error::{ClientError, ClientResult};
use crate::transport::Payload;

pub const CONSOLE_PROMPT: &str = "=> ";

const ATTACH_FAILED: &str = "Unable to attach to a dyno to open a console session.\n\
Your application may have crashed.\n\
Check the output of `skiff ps` and `skiff logs` for more information.";

impl Client {
    /// Evaluates `command` in a throwaway console and returns its raw output.
    pub async fn run_one_off(&self, app: &str, command: &str) -> ClientResult<String> {
        let path = format!("/apps/{}/console", segment(app));
        self.run_console_command(&path, command, None).await
    }

    /// Opens a console that keeps state between commands. Close it with
    /// [`ScopedConsole::close`]; a console dropped while open is deleted in the
    /// background.
    pub async fn open_console(&self, app: &str) -> ClientResult<ScopedConsole> {
        let path = format!("/apps/{}/consoles", segment(app));
        let response = self
            .post(path, Payload::Empty)
            .await
            .map_err(|err| match err.classify_crash() {
                ClientError::AppCrashed(_) => ClientError::AppCrashed(ATTACH_FAILED.to_string()),
                other => other,
            })?;
        let id = response.body.trim();
        if id.is_empty() {
            return Err(ClientError::InvalidResponse(
                "console creation returned no session id".into(),
            ));
        }
        tracing::debug!(target: "skiff::console", app, id, "console opened");
        Ok(ScopedConsole {
            client: self.clone(),
            app: app.to_string(),
            id: id.to_string(),
            open: true,
        })
    }

    async fn run_console_command(
        &self,
        path: &str,
        command: &str,
        prompt: Option<&str>,
    ) -> ClientResult<String> {
        let output = self
            .post(path, Payload::text(command))
            .await
            .map_err(ClientError::classify_crash)?
            .body;
        Ok(match prompt {
            Some(prompt) => prefix_last_line(&output, prompt),
            None => output,
        })
    }
}

/// Puts `prompt` in front of the last line of `output`, dropping trailing
/// newlines.
pub fn prefix_last_line(output: &str, prompt: &str) -> String {
    let trimmed = output.trim_end_matches('\n');
    match trimmed.rsplit_once('\n') {
        Some((head, last)) => format!("{head}\n{prompt}{last}"),
        None => format!("{prompt}{trimmed}"),
    }
}

/// A remote console session bound to one application.
pub struct ScopedConsole {
    client: Client,
    app: String,
    id: String,
    open: bool,
}

impl ScopedConsole {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn app(&self) -> &str {
        &self.app
    }

    /// Runs `command` and returns its output with the console prompt on the
    /// last line.
    pub async fn run(&self, command: &str) -> ClientResult<String> {
        self.client
            .run_console_command(&self.command_path(), command, Some(CONSOLE_PROMPT))
            .await
    }

    pub async fn close(mut self) -> ClientResult<()> {
        self.open = false;
        delete_console(&self.client, &self.app, &self.id).await
    }

    fn command_path(&self) -> String {
        format!("{}/command", console_path(&self.app, &self.id))
    }
}

impl Drop for ScopedConsole {
    fn drop(&mut self) {
        if !self.open {
            return;
        }
        let client = self.client.clone();
        let app = std::mem::take(&mut self.app);
        let id = std::mem::take(&mut self.id);
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    if let Err(err) = delete_console(&client, &app, &id).await {
                        tracing::warn!(
                            target: "skiff::console",
                            app = %app,
                            id = %id,
                            error = %err,
                            "failed to delete console"
                        );
                    }
                });
            }
            Err(_) => {
                tracing::warn!(
                    target: "skiff::console",
                    app = %app,
                    id = %id,
                    "console dropped outside a runtime; remote session left open"
                );
            }
        }
    }
}

impl fmt::Debug for ScopedConsole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScopedConsole")
            .field("app", &self.app)
            .field("id", &self.id)
            .field("open", &self.open)
            .finish()
    }
}

fn console_path(app: &str, id: &str) -> String {
    format!("/apps/{}/consoles/{}", segment(app), segment(id))
}

async fn delete_console(client: &Client, app: &str, id: &str) -> ClientResult<()> {
    client.delete(console_path(app, id)).await?;
    tracing::debug!(target: "skiff::console", app, id, "console closed");
    Ok(())
}
