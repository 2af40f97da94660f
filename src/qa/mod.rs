//! Thin client for the remote question-answering service.

pub mod error;
pub mod protocol;
pub mod session;
pub mod transport;

use bevy::prelude::*;

use crate::core::config::ViewerConfig;
use crate::core::portfolio::FrameSet;
use session::*;
use transport::{HttpTransport, QaClient};

pub struct QaPlugin;

impl Plugin for QaPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<QaSession>()
            .add_event::<SubmitQuery>()
            .add_systems(Startup, install_http_client)
            .add_systems(
                Update,
                (dispatch_submissions, poll_in_flight)
                    .chain()
                    .in_set(FrameSet::Advance),
            )
            .add_systems(Last, cancel_queries_on_exit);
    }
}

// A client inserted before startup (tests, alternative backends) takes precedence
fn install_http_client(
    mut commands: Commands,
    config: Res<ViewerConfig>,
    existing: Option<Res<QaClient>>,
) {
    if existing.is_some() {
        return;
    }
    match QaClient::new(HttpTransport::new(config.qa_endpoint.clone())) {
        Ok(client) => {
            info!("QA client targeting {}", config.qa_endpoint);
            commands.insert_resource(client);
        }
        // Questions then settle with a transport error instead of hanging
        Err(err) => error!("QA client disabled: {}", err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn viewer_config_is_left_to_the_portfolio_plugin() {
        let mut app = App::new();
        app.add_plugins(QaPlugin);
        assert!(app.world().contains_resource::<QaSession>());
        assert!(!app.world().contains_resource::<ViewerConfig>());
    }
}
