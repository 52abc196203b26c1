use serde::Serialize;

use crate::{
    persistence::SessionStore,
    reports::{ReportSummary, ReportWindow},
};

use super::{SessionController, SessionSnapshot};

/// Control messages accepted from the inbound stream.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionCommand {
    Start { name: String },
    Stop,
    Status,
    Report { window: ReportWindow },
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum CommandReply {
    Started { snapshot: SessionSnapshot },
    Stopped { snapshot: Option<SessionSnapshot> },
    Status { snapshot: SessionSnapshot },
    Report { summary: ReportSummary, text: String },
}

pub async fn dispatch<S: SessionStore>(
    controller: &SessionController<S>,
    command: SessionCommand,
) -> Result<CommandReply, String> {
    match command {
        SessionCommand::Start { name } => controller
            .start_session(&name)
            .await
            .map(|snapshot| CommandReply::Started { snapshot })
            .map_err(|e| e.to_string()),
        SessionCommand::Stop => controller
            .stop_session()
            .await
            .map(|snapshot| CommandReply::Stopped { snapshot })
            .map_err(|e| e.to_string()),
        SessionCommand::Status => Ok(CommandReply::Status {
            snapshot: controller.snapshot().await,
        }),
        SessionCommand::Report { window } => {
            let summary = controller.report(window).await.map_err(|e| e.to_string())?;
            Ok(CommandReply::Report {
                text: summary.to_string(),
                summary,
            })
        }
    }
}
