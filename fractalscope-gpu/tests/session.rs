//! Session behavior: frames, preset switching and view navigation.

use fractalscope_core::{FractalKind, Viewport};
use fractalscope_gpu::{
    Fractal, GpuAvailability, GpuContext, GpuError, OffscreenTarget, OptionEdit, Session,
};
use std::sync::Arc;

async fn sierpinski_session(resolution: (u32, u32)) -> Option<(Arc<GpuContext>, Session)> {
    let GpuAvailability::Available(ctx) = GpuContext::try_init().await else {
        println!("Skipping test: no GPU available");
        return None;
    };
    let ctx = Arc::new(ctx);
    match Session::with_affine_size(Arc::clone(&ctx), FractalKind::Sierpinski, resolution, (64, 64))
    {
        Ok(session) => Some((ctx, session)),
        Err(GpuError::MissingCapability(what)) => {
            println!("Skipping test: {what}");
            None
        }
        Err(e) => panic!("Session creation failed: {e}"),
    }
}

fn affine_counter(session: &Session) -> u32 {
    session
        .fractal()
        .as_affine()
        .map(|engine| engine.counter())
        .unwrap_or_default()
}

#[test]
fn frames_advance_only_when_enabled() {
    pollster::block_on(async {
        let Some((ctx, mut session)) = sierpinski_session((64, 64)).await else {
            return;
        };
        assert_eq!(session.iterations_per_frame(), 1);
        assert!(session.iterate_enabled());

        let target = OffscreenTarget::new(&ctx, (64, 64)).unwrap();
        session.frame(&target.target()).unwrap();
        session.frame(&target.target()).unwrap();
        assert_eq!(affine_counter(&session), 3);

        session.set_iterate_enabled(false);
        session.frame(&target.target()).unwrap();
        assert_eq!(affine_counter(&session), 3);

        session.set_iterate_enabled(true);
        session.set_iterations_per_frame(4);
        session.frame(&target.target()).unwrap();
        assert_eq!(affine_counter(&session), 7);

        session.reset().unwrap();
        assert_eq!(affine_counter(&session), 1);
    });
}

#[test]
fn initial_view_fits_window_aspect() {
    pollster::block_on(async {
        let Some((_ctx, session)) = sierpinski_session((200, 100)).await else {
            return;
        };
        let view = session.viewport();
        assert!((view.width() - 2.0).abs() < 1e-12);
        assert!((view.height() - 1.0).abs() < 1e-12);
        assert_eq!(view.center(), (0.5, 0.5));
    });
}

#[test]
fn resize_keeps_center_and_height() {
    pollster::block_on(async {
        let Some((ctx, mut session)) = sierpinski_session((64, 64)).await else {
            return;
        };
        let before = session.viewport();

        let wide = OffscreenTarget::new(&ctx, (128, 64)).unwrap();
        session.frame(&wide.target()).unwrap();

        let after = session.viewport();
        assert_eq!(after.center(), before.center());
        assert!((after.height() - before.height()).abs() < 1e-12);
        assert!((after.width() - 2.0 * before.height()).abs() < 1e-12);
    });
}

#[test]
fn navigation_moves_the_view() {
    pollster::block_on(async {
        let Some((_ctx, mut session)) = sierpinski_session((64, 64)).await else {
            return;
        };
        let home = session.viewport();

        session.pan(0.5, 0.0);
        assert_eq!(session.viewport().left, home.left + 0.5 * home.width());

        session.zoom(2.0, (0.5, 0.5));
        assert!((session.viewport().width() - home.width() / 2.0).abs() < 1e-12);

        let zoomed = session.viewport();
        session.zoom(0.0, (0.5, 0.5));
        session.zoom(-3.0, (0.5, 0.5));
        session.zoom(f64::NAN, (0.5, 0.5));
        assert_eq!(session.viewport(), zoomed);

        session.reset_view();
        assert_eq!(session.viewport(), home);
    });
}

#[test]
fn select_switches_or_keeps_previous() {
    pollster::block_on(async {
        let Some((_ctx, mut session)) = sierpinski_session((64, 64)).await else {
            return;
        };

        session.select(FractalKind::SierpinskiCarpet).unwrap();
        assert_eq!(session.kind(), FractalKind::SierpinskiCarpet);
        assert_eq!(session.fractal().as_affine().map(|e| e.size()), Some((64, 64)));

        match session.select(FractalKind::Mandelbrot) {
            Ok(()) => {
                assert_eq!(session.kind(), FractalKind::Mandelbrot);
                assert!(session.fractal().as_mandelbrot().is_some());
                assert_eq!(
                    session.iterations_per_frame(),
                    session.fractal().preferred_iterations_per_frame()
                );
            }
            Err(e) => {
                println!("Mandelbrot unavailable: {e}");
                assert_eq!(session.kind(), FractalKind::SierpinskiCarpet);
                assert!(session.fractal().as_affine().is_some());
            }
        }
    });
}

#[test]
fn edits_route_to_the_active_engine() {
    pollster::block_on(async {
        let Some((_ctx, mut session)) = sierpinski_session((64, 64)).await else {
            return;
        };

        session.apply(OptionEdit::Size((32, 16))).unwrap();
        assert_eq!(session.fractal().as_affine().map(|e| e.size()), Some((32, 16)));

        assert!(matches!(
            session.apply(OptionEdit::Oversampling(2)),
            Err(GpuError::InvalidConfig(_))
        ));

        session
            .apply(OptionEdit::Viewport(Viewport::new(-1.0, 1.0, -1.0, 1.0)))
            .unwrap();
        session.reset_view();
        assert_eq!(session.viewport(), Viewport::new(-1.0, 1.0, -1.0, 1.0));
    });
}

#[test]
fn iterations_per_frame_edit_applies_to_affine_sessions() {
    pollster::block_on(async {
        let Some((ctx, mut session)) = sierpinski_session((64, 64)).await else {
            return;
        };

        session.apply(OptionEdit::IterationsPerFrame(5)).unwrap();
        assert_eq!(session.iterations_per_frame(), 5);

        let target = OffscreenTarget::new(&ctx, (64, 64)).unwrap();
        session.frame(&target.target()).unwrap();
        assert_eq!(affine_counter(&session), 6);

        // A rejected edit leaves the session untouched.
        assert!(session.apply(OptionEdit::Oversampling(2)).is_err());
        assert_eq!(session.iterations_per_frame(), 5);
    });
}
