// Scene configuration constants
// All magic numbers for the avatar viewer, galaxy background, shader backdrop and QA panel

// === WINDOW AND DISPLAY ===
pub const WINDOW_TITLE: &str = "Portfolio";
pub const WINDOW_WIDTH: f32 = 1280.0;
pub const WINDOW_HEIGHT: f32 = 720.0;

/// Frame rate that the per-frame increments below were tuned for
pub const REFERENCE_FPS: f32 = 60.0;

// === RENDER LAYERS ===
pub mod layers {
    pub const AVATAR: usize = 0;
    pub const GALAXY: usize = 1;
    pub const BACKDROP: usize = 2;
}

// === CAMERA ORDERING ===
pub mod camera_order {
    pub const GALAXY: isize = 0;
    pub const BACKDROP: isize = 1;
    pub const AVATAR: isize = 2;
}

// === CONTAINERS ===
// Fractions of the primary window: (x, y, width, height)
pub mod containers {
    pub const AVATAR: (f32, f32, f32, f32) = (0.55, 0.08, 0.4, 0.6);
    pub const BACKGROUND: (f32, f32, f32, f32) = (0.0, 0.0, 1.0, 1.0);
}

// === ASSETS ===
pub mod assets {
    pub const AVATAR_MODEL: &str = "models/ani.glb";
    pub const TUNNEL_SHADER: &str = "shaders/voronoi_tunnel.wgsl";
}

// === AVATAR ===
pub mod avatar {
    use bevy::prelude::*;

    /// Clip names baked into the avatar asset
    pub const IDLE_CLIP: &str = "thanos";
    pub const STUMBLE_CLIP: &str = "cools";
    pub const CHI_CLIP: &str = "chi";

    // Pick bounds: vertical capsule roughly enclosing the rig
    pub const PICK_CENTER: Vec3 = Vec3::new(0.0, 0.75, 0.0);
    pub const PICK_HALF_HEIGHT: f32 = 0.55;
    pub const PICK_RADIUS: f32 = 0.3;

    // Pedestal
    pub const PEDESTAL_RADIUS: f32 = 0.6;
    pub const PEDESTAL_HEIGHT: f32 = 0.1;
    pub const PEDESTAL_RESOLUTION: u32 = 64;
}

// === PLAYBACK TIMINGS (seconds) ===
pub mod playback {
    pub const STUMBLE_FADE_IN: f32 = 0.3;
    pub const STUMBLE_HOLD: f32 = 4.0;
    pub const CHI_FADE_IN: f32 = 0.0;
    pub const CHI_HOLD: f32 = 3.0;
    pub const RETURN_FADE: f32 = 1.0;
    pub const RELEASE_DELAY: f32 = 1.0;
}

// === PROPS ===
pub mod props {
    use bevy::prelude::*;

    pub struct PropPlacement {
        pub path: &'static str,
        pub position: Vec3,
        /// Uniform colour override for every mesh in the prop
        pub tint: Option<u32>,
        /// Euler increments per reference frame (x, y, z)
        pub spin_per_frame: Vec3,
    }

    pub const PROPS: [PropPlacement; 3] = [
        PropPlacement {
            path: "models/bawl.glb",
            position: Vec3::new(1.0, 0.75, 0.0),
            tint: None,
            spin_per_frame: Vec3::new(0.05, 0.05, 0.0),
        },
        PropPlacement {
            path: "models/iron.glb",
            position: Vec3::new(-1.0, 0.75, 0.0),
            tint: Some(0xb3072f),
            spin_per_frame: Vec3::new(0.0, 0.02, 0.0),
        },
        PropPlacement {
            path: "models/guitar.glb",
            position: Vec3::new(0.0, 0.75, -1.0),
            tint: Some(0x855103),
            spin_per_frame: Vec3::new(0.0, -0.01, 0.0),
        },
    ];
}

// === CAMERA SYSTEM ===
pub mod camera {
    use bevy::prelude::*;

    pub const AVATAR_FOV_DEGREES: f32 = 45.0;
    pub const ORBIT_TARGET: Vec3 = Vec3::new(0.0, 0.75, 0.0);
    /// Starting eye position before the orbit constraints are applied
    pub const INITIAL_EYE: Vec3 = Vec3::new(0.2, 0.5, 1.0);
    pub const ORBIT_DISTANCE: f32 = 3.0;
    pub const ORBIT_POLAR: f32 = 1.4;
    pub const ORBIT_DRAG_SENSITIVITY: f32 = std::f32::consts::TAU;
    /// Fraction of remaining velocity kept after one reference frame
    pub const ORBIT_DAMPING: f32 = 0.95;
    pub const ORBIT_REST_VELOCITY: f32 = 1e-4;
}

// === LIGHTING ===
pub mod lights {
    use bevy::prelude::*;

    pub const AMBIENT_BRIGHTNESS: f32 = 400.0;
    pub const SPOT_POSITION: Vec3 = Vec3::new(0.0, 4.0, 2.0);
    pub const SPOT_INTENSITY: f32 = 200_000.0;
    pub const SPOT_RANGE: f32 = 8.0;
    pub const SPOT_ANGLE: f32 = 1.0;
    pub const SPOT_PENUMBRA: f32 = 0.5;
    pub const KEY_POSITION: Vec3 = Vec3::new(1.0, 1.0, 2.0);
    pub const KEY_ILLUMINANCE: f32 = 2_000.0;
}

// === GALAXY BACKGROUND ===
pub mod galaxy {
    use bevy::prelude::*;

    pub const STAR_COUNT: usize = 10_000;
    pub const MAX_RADIUS: f32 = 5.0;
    /// Angle per unit radius, which bends the disc into a spiral
    pub const SPIRAL_TWIST: f32 = 10.0;
    pub const THICKNESS: f32 = 1.0;
    pub const MIN_STAR_SIZE: f32 = 0.02;
    pub const STAR_SIZE_SPREAD: f32 = 0.03;
    pub const STAR_COLOR: Color = Color::srgba(0.5, 0.5, 1.0, 0.8);
    pub const FOV_DEGREES: f32 = 75.0;
    pub const CAMERA_DISTANCE: f32 = 10.0;
    pub const SPIN_PER_FRAME: f32 = 0.002;
    pub const SEED: u64 = 0x6a756c69;
}

// === SHADER BACKDROP ===
pub mod backdrop {
    /// Shader clock advance per reference frame
    pub const TIME_STEP_PER_FRAME: f32 = 0.05;
}

// === QUESTION ANSWERING ===
pub mod qa {
    pub const ENDPOINT: &str = "https://dajulster-julienserbanescu-rag.hf.space/api/query";
    pub const EMPTY_QUERY_MESSAGE: &str = "Please enter a question.";
    pub const MISSING_RESPONSE_TEXT: &str = "No response text received.";
    pub const NOT_AVAILABLE: &str = "N/A";
}

// === LOGGING ===
pub mod logging {
    pub const DEBUG_FILTER: &str = "wgpu=error,naga=warn,portfolio_scenes=debug";
    pub const QUIET_FILTER: &str = "wgpu=error,naga=error,portfolio_scenes=warn";
    pub const FLAME_OUTPUT: &str = "trace.folded";
}

// === UI CONSTANTS ===
pub mod ui {
    use bevy::prelude::*;

    pub const LOADING_TEXT_SIZE: f32 = 22.0;
    pub const PANEL_WIDTH: f32 = 560.0;
    pub const PANEL_PADDING: f32 = 14.0;
    pub const PANEL_GAP: f32 = 8.0;
    pub const TITLE_TEXT_SIZE: f32 = 22.0;
    pub const BODY_TEXT_SIZE: f32 = 15.0;
    pub const INPUT_HEIGHT: f32 = 36.0;
    pub const BUTTON_WIDTH: f32 = 150.0;
    pub const CARET: &str = "_";
    pub const QUERY_PLACEHOLDER: &str = "Ask something about my research...";

    pub const PANEL_BACKGROUND: Color = Color::srgba(0.05, 0.05, 0.12, 0.85);
    pub const INPUT_BACKGROUND: Color = Color::srgba(0.12, 0.12, 0.2, 0.9);
    pub const BORDER_COLOR: Color = Color::srgba(0.4, 0.4, 0.8, 0.6);
    pub const TEXT_COLOR: Color = Color::srgb(0.92, 0.92, 0.98);
    pub const MUTED_TEXT_COLOR: Color = Color::srgb(0.6, 0.6, 0.7);
    pub const ERROR_TEXT_COLOR: Color = Color::srgb(1.0, 0.45, 0.45);
}
