use argh::FromArgs;
use arpose::frames::{
    CompositorConfig, CoordinateFrame, FrameCompositor, FramePair, MockPoseService, PoseListener,
    RawPose, Session,
};
use arpose::lie::{SE3F32, SO3F32, Vec3A};
use rand::Rng;
use std::{
    path::PathBuf,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::{Duration, Instant},
};

#[derive(FromArgs)]
/// Stream simulated device poses into a render loop
struct Args {
    /// the render loop frames per second
    #[argh(option, short = 'f', default = "30")]
    fps: u32,

    /// the pose callback rate in Hz
    #[argh(option, short = 'r', default = "100")]
    rate: u32,

    /// probability of a pose reporting lost tracking
    #[argh(option, short = 'l', default = "0.05")]
    lost: f32,

    /// the duration in seconds to run the app
    #[argh(option, short = 'd')]
    duration: Option<u64>,

    /// path to a JSON compositor configuration
    #[argh(option, short = 'c')]
    config: Option<PathBuf>,
}

/// Mount the sensors the way a phone-sized device would: the IMU sits rotated in the
/// body, the cameras a few centimeters away from it.
fn scripted_service() -> Arc<MockPoseService> {
    let service = Arc::new(MockPoseService::new());

    let imu_t_device = SE3F32::new(
        SO3F32::from_axis_angle(Vec3A::Z, std::f32::consts::FRAC_PI_2),
        Vec3A::new(0.0, 0.01, 0.0),
    );
    service.set_static(FramePair::IMU_T_DEVICE, imu_t_device);

    for (sensor, offset) in [
        (CoordinateFrame::CameraColor, Vec3A::new(0.06, 0.0, 0.0)),
        (CoordinateFrame::CameraDepth, Vec3A::new(0.04, 0.0, 0.0)),
        (CoordinateFrame::CameraFisheye, Vec3A::new(0.02, 0.0, 0.0)),
    ] {
        let imu_t_sensor = SE3F32::new(
            SO3F32::from_axis_angle(Vec3A::X, std::f32::consts::PI),
            offset,
        );
        service.set_static(FramePair::new(CoordinateFrame::Imu, sensor), imu_t_sensor);
    }

    service
}

/// The device walks a circle of one meter radius at head height, facing along the path.
fn circle_pose(pair: FramePair, t: f64, status_code: i32) -> RawPose {
    let theta = 0.5 * t;
    let heading = theta + std::f64::consts::FRAC_PI_2;
    RawPose {
        timestamp: t,
        position: [theta.cos(), theta.sin(), 1.6],
        orientation: [0.0, 0.0, (0.5 * heading).sin(), (0.5 * heading).cos()],
        status_code,
        frame_pair: pair,
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args: Args = argh::from_env();

    let config = match &args.config {
        Some(path) => CompositorConfig::from_file(path)?,
        None => CompositorConfig::default(),
    };
    log::info!("compositor config: {config:?}");

    let service = scripted_service();
    let mut session = Session::new(service);
    session.connect()?;

    let mut compositor = FrameCompositor::from_config(&config)?;
    compositor.initialize(&mut session)?;

    let mut listener = PoseListener::new();
    let reader = listener.subscribe(compositor.frame_pair());

    // create a cancel token to stop the streams
    let cancel_token = Arc::new(AtomicBool::new(false));

    ctrlc::set_handler({
        let cancel_token = cancel_token.clone();
        move || {
            log::info!("Received Ctrl-C signal. Sending cancel signal !!");
            cancel_token.store(true, Ordering::SeqCst);
        }
    })?;

    // we launch a timer to cancel the token after a certain duration
    std::thread::spawn({
        let cancel_token = cancel_token.clone();
        move || {
            if let Some(duration_secs) = args.duration {
                std::thread::sleep(Duration::from_secs(duration_secs));
                log::info!("Sending timer cancel signal !!");
                cancel_token.store(true, Ordering::SeqCst);
            }
        }
    });

    // the callback thread only converts and publishes, it never touches render state
    let pair = compositor.frame_pair();
    let sensor_period = Duration::from_secs_f64(1.0 / args.rate.max(1) as f64);
    let lost = args.lost;
    let producer = std::thread::spawn({
        let cancel_token = cancel_token.clone();
        move || {
            let mut rng = rand::rng();
            let start = Instant::now();
            while !cancel_token.load(Ordering::SeqCst) {
                let status_code = if rng.random::<f32>() < lost { 2 } else { 1 };
                let t = start.elapsed().as_secs_f64();
                listener.on_pose_available(circle_pose(pair, t, status_code));
                std::thread::sleep(sensor_period);
            }
        }
    });

    let frame_period = Duration::from_secs_f64(1.0 / args.fps.max(1) as f64);
    let mut frames = 0u64;
    let mut lost_frames = 0u64;

    while !cancel_token.load(Ordering::SeqCst) {
        let frame_start = Instant::now();

        // picks up fresh extrinsics if the session reconnected
        compositor.sync(&mut session)?;

        match compositor.poll(&reader) {
            Ok(Some(transform)) => {
                log::info!(
                    "frame {frames}: {} at {:?}",
                    compositor.sensor(),
                    transform.translation()
                );
            }
            Ok(None) => log::debug!("frame {frames}: no new pose"),
            Err(err) if err.is_recoverable() => {
                lost_frames += 1;
                log::debug!("frame {frames}: {err}, holding {:?}", compositor.transform());
            }
            Err(err) => return Err(err.into()),
        }
        frames += 1;

        if let Some(remaining) = frame_period.checked_sub(frame_start.elapsed()) {
            std::thread::sleep(remaining);
        }
    }

    producer.join().map_err(|_| "pose producer panicked")?;

    log::info!(
        "Finished after {frames} frames ({lost_frames} lost). {} poses published, {} overwritten.",
        reader.published(),
        reader.overwritten()
    );

    Ok(())
}
