//! Session action commands: `start` and `end`.

use anyhow::Result;
use freezer_types::RunResult;

use crate::client::{ActionReply, ApiClient};

/// Report a job start for the round identified by `current_tag`.
pub async fn start(
    client: &ApiClient,
    session_id: &str,
    job_id: &str,
    current_tag: i64,
) -> Result<ActionReply> {
    let reply = client.start(session_id, job_id, current_tag).await?;
    println!("{} (session_tag: {})", reply.result, reply.session_tag);
    Ok(reply)
}

/// Report a job end with its result.
pub async fn end(
    client: &ApiClient,
    session_id: &str,
    job_id: &str,
    result: &str,
) -> Result<ActionReply> {
    let reply = client
        .end(session_id, job_id, &RunResult::from(result))
        .await?;
    println!("{} (session_tag: {})", reply.result, reply.session_tag);
    Ok(reply)
}

#[cfg(test)]
mod tests {
    use super::super::{job, session, test_support::spawn_api};
    use super::*;
    use freezer_types::RunStatus;

    #[tokio::test]
    async fn round_trip_through_the_state_machine() {
        let client = spawn_api().await;
        let id = session::create(&client, "nightly", Some(60)).await.unwrap();
        job::attach(&client, &id, "job-1", None).await.unwrap();
        job::attach(&client, &id, "job-2", None).await.unwrap();

        let reply = start(&client, &id, "job-1", 0).await.unwrap();
        assert_eq!(reply.result, "success");
        assert_eq!(reply.session_tag, 1);

        // Same round again inside the window.
        let reply = start(&client, &id, "job-2", 1).await.unwrap();
        assert_eq!(reply.result, "hold-off");

        // A client still on the previous round catches up.
        let reply = start(&client, &id, "job-2", 0).await.unwrap();
        assert_eq!(reply.result, "success");
        assert_eq!(reply.session_tag, 1);

        end(&client, &id, "job-1", "success").await.unwrap();
        end(&client, &id, "job-2", "success").await.unwrap();

        let session = client.get_session(&id).await.unwrap();
        assert_eq!(session.status, RunStatus::Completed);
        assert_eq!(session.result, RunResult::Success);
    }

    #[tokio::test]
    async fn tag_ahead_of_session_is_rejected() {
        let client = spawn_api().await;
        let id = session::create(&client, "nightly", None).await.unwrap();
        job::attach(&client, &id, "job-1", None).await.unwrap();

        let err = start(&client, &id, "job-1", 3).await.unwrap_err();
        assert!(err.to_string().contains("requested tag value too high"));
    }
}
