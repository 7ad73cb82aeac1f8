//! Job attachment commands.

use anyhow::Result;

use crate::client::ApiClient;

/// Attach a job to a session.
pub async fn attach(
    client: &ApiClient,
    session_id: &str,
    job_id: &str,
    client_id: Option<&str>,
) -> Result<()> {
    client.attach_job(session_id, job_id, client_id).await?;
    println!("Attached job {job_id} to session {session_id}");
    Ok(())
}

/// Detach a job from a session.
pub async fn detach(client: &ApiClient, session_id: &str, job_id: &str) -> Result<()> {
    client.detach_job(session_id, job_id).await?;
    println!("Detached job {job_id} from session {session_id}");
    Ok(())
}
