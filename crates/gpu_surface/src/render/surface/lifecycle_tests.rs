//! Lifecycle scenarios for the surface manager against the headless context

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crate::core::config::{CompositorConfig, ContextConfig, SharingMode};
    use crate::render::compositor::{ExternalViewEmbedder, OverlayCompositor};
    use crate::render::context::{ContextCapabilities, ContextRole, HeadlessContext, SurfaceError, SurfaceKind};
    use crate::render::surface::{
        GlContextResult, GlSurfaceDelegate, NullBackendContext, PlatformSurface, SurfaceLifecycleManager, SurfaceState,
    };
    use crate::render::window::{NativeWindow, WindowMailbox, WindowMessage};
    use crate::render::{FramebufferId, SurfaceSize};

    fn window(address: usize) -> NativeWindow {
        NativeWindow::android(address, SurfaceSize::new(1080, 1920))
    }

    fn headless() -> Arc<HeadlessContext> {
        Arc::new(HeadlessContext::new(ContextConfig::default()))
    }

    fn manager(context: &Arc<HeadlessContext>) -> SurfaceLifecycleManager {
        SurfaceLifecycleManager::new(context.clone(), CompositorConfig::disabled())
    }

    fn with_shared_overlay(
        context: &Arc<HeadlessContext>,
        config: CompositorConfig,
    ) -> (SurfaceLifecycleManager, Arc<OverlayCompositor>) {
        let overlay = Arc::new(OverlayCompositor::from_config(&config));
        let shared = Arc::clone(&overlay);
        let manager = SurfaceLifecycleManager::with_embedder_factory(context.clone(), config, move |_| {
            Box::new(Arc::clone(&shared)) as Box<dyn ExternalViewEmbedder>
        });
        (manager, overlay)
    }

    #[test]
    fn test_bind_resize_teardown_rebind() {
        let context = headless();
        let mut manager = manager(&context);
        let w1 = window(0x1000);

        assert!(manager.is_valid());
        assert!(manager.set_native_window(w1.clone()));
        assert_eq!(manager.state(), SurfaceState::Bound);
        assert!(manager.gl_context_make_current().succeeded());

        let fbo_before = manager.gl_context_fbo();
        assert!(manager.on_screen_surface_resize(SurfaceSize::new(800, 600)));
        assert_eq!(manager.on_screen_size(), Some(SurfaceSize::new(800, 600)));
        assert_eq!(manager.gl_context_fbo(), fbo_before);
        assert_eq!(fbo_before, FramebufferId::DEFAULT);

        manager.teardown_on_screen_context();
        assert_eq!(manager.state(), SurfaceState::NoWindow);
        assert!(manager.native_window().is_none());

        assert!(manager.set_native_window(w1));
        assert_eq!(manager.state(), SurfaceState::Bound);
    }

    #[test]
    fn test_invalid_config_rejects_everything() {
        let context = Arc::new(HeadlessContext::new(ContextConfig::new().with_depth_stencil(12, 8)));
        let mut manager = manager(&context);

        assert!(!manager.is_valid());
        assert!(manager.create_gpu_surface(Arc::new(NullBackendContext::new())).is_none());
        assert!(!manager.set_native_window(window(0x1000)));
        assert!(!manager.has_offscreen_surface());
        assert_eq!(
            manager.gl_context_make_current(),
            GlContextResult::Failed(SurfaceError::InvalidContext)
        );
    }

    #[test]
    fn test_present_without_compositor() {
        let context = headless();
        let mut manager = manager(&context);

        assert!(manager.external_view_embedder().is_none());
        assert!(manager.set_native_window(window(0x1000)));
        assert!(manager.gl_context_make_current().succeeded());
        assert!(manager.gl_context_present());
        assert_eq!(context.swap_count(), 1);
    }

    #[test]
    fn test_rebinding_does_not_leak_surfaces_or_windows() {
        let context = headless();
        let mut manager = manager(&context);
        let w1 = window(0x1000);
        let w2 = window(0x2000);

        assert!(manager.set_native_window(w1.clone()));
        assert!(manager.set_native_window(w2.clone()));

        assert_eq!(context.live_surfaces(SurfaceKind::OnScreen), 1);
        assert_eq!(w1.reference_count(), 1);
        assert_eq!(manager.native_window(), Some(w2));
    }

    #[test]
    fn test_teardown_is_idempotent() {
        let context = headless();
        let mut manager = manager(&context);
        assert!(manager.set_native_window(window(0x1000)));
        assert!(manager.gl_context_make_current().succeeded());

        manager.teardown_on_screen_context();
        manager.teardown_on_screen_context();

        assert_eq!(manager.state(), SurfaceState::NoWindow);
        assert_eq!(context.live_surfaces(SurfaceKind::OnScreen), 0);
        assert!(context.current_binding().is_none());
    }

    #[test]
    fn test_resize_without_surface() {
        let context = headless();
        let mut manager = manager(&context);
        assert!(!manager.on_screen_surface_resize(SurfaceSize::new(800, 600)));
        assert_eq!(manager.state(), SurfaceState::NoWindow);
        assert_eq!(context.live_surfaces(SurfaceKind::OnScreen), 0);
    }

    #[test]
    fn test_repeated_make_current_does_not_rebind() {
        let context = headless();
        let mut manager = manager(&context);
        assert!(manager.set_native_window(window(0x1000)));

        assert_eq!(
            manager.gl_context_make_current(),
            GlContextResult::Current {
                target: SurfaceKind::OnScreen,
                already_current: false
            }
        );
        let binds = context.bind_count();
        for _ in 0..10 {
            assert_eq!(
                manager.gl_context_make_current(),
                GlContextResult::Current {
                    target: SurfaceKind::OnScreen,
                    already_current: true
                }
            );
        }
        assert_eq!(context.bind_count(), binds);
    }

    #[test]
    fn test_render_and_resource_threads_run_concurrently() {
        let context = headless();
        let mut manager = manager(&context);
        let resource = manager.resource_context();
        let queries = &context;

        std::thread::scope(|scope| {
            let resource_thread = scope.spawn(move || {
                for _ in 0..200 {
                    assert!(resource.make_current());
                    let binding = queries.current_binding().unwrap();
                    assert_eq!((binding.role, binding.kind), (ContextRole::Resource, SurfaceKind::OffScreen));

                    assert!(resource.clear_current());
                    assert!(queries.current_binding().is_none());
                }
            });

            let render_thread = scope.spawn(|| {
                for i in 0..50 {
                    assert!(manager.set_native_window(window(0x1000 + i)));
                    assert!(queries.current_binding().is_none());

                    assert!(manager.gl_context_make_current().succeeded());
                    let binding = queries.current_binding().unwrap();
                    assert_eq!((binding.role, binding.kind), (ContextRole::Render, SurfaceKind::OnScreen));

                    assert!(manager.on_screen_surface_resize(SurfaceSize::new(800, 600)));
                    let binding = queries.current_binding().unwrap();
                    assert_eq!((binding.role, binding.kind), (ContextRole::Render, SurfaceKind::OnScreen));

                    assert!(manager.gl_context_present());
                    manager.teardown_on_screen_context();
                    assert!(queries.current_binding().is_none());
                }
            });

            resource_thread.join().unwrap();
            render_thread.join().unwrap();
        });

        assert_eq!(context.live_surfaces(SurfaceKind::OnScreen), 0);
        assert_eq!(context.swap_count(), 50);
        assert_eq!(context.bound_thread_count(), 0);
    }

    #[test]
    fn test_isolated_context_has_no_resource_pair() {
        let context = Arc::new(HeadlessContext::new(
            ContextConfig::default().with_sharing(SharingMode::Isolated),
        ));
        let mut manager = manager(&context);
        assert!(manager.has_offscreen_surface());

        assert!(manager.set_native_window(window(0x1000)));
        assert!(manager.gl_context_make_current().succeeded());
        let before = context.current_binding();

        assert!(!manager.resource_context_make_current());
        assert!(!manager.resource_context_clear_current());
        let resource = manager.resource_context();
        assert!(!resource.make_current());
        assert!(!resource.clear_current());

        assert_eq!(context.current_binding(), before);
        assert!(manager.gl_context_present());
    }

    #[test]
    fn test_resource_clear_keeps_render_binding() {
        let context = headless();
        let mut manager = manager(&context);
        assert!(manager.set_native_window(window(0x1000)));
        assert!(manager.gl_context_make_current().succeeded());

        assert!(manager.resource_context_clear_current());
        let binding = context.current_binding().unwrap();
        assert_eq!((binding.role, binding.kind), (ContextRole::Render, SurfaceKind::OnScreen));
        assert!(manager.gl_context_present());
    }

    #[test]
    fn test_destroyed_window_fails_make_current() {
        let context = headless();
        let mut manager = manager(&context);
        let w1 = window(0x1000);
        assert!(manager.set_native_window(w1.clone()));

        w1.invalidate();
        let result = manager.gl_context_make_current();
        assert!(matches!(result, GlContextResult::Failed(SurfaceError::SurfaceLost(_))));
        assert!(!manager.gl_context_present());

        // A fresh window recovers
        assert!(manager.set_native_window(window(0x2000)));
        assert!(manager.gl_context_make_current().succeeded());
    }

    #[test]
    fn test_failed_bind_retains_nothing() {
        let context = headless();
        let mut manager = manager(&context);
        assert!(manager.set_native_window(window(0x1000)));

        let dead = window(0x2000);
        dead.invalidate();
        assert!(!manager.set_native_window(dead.clone()));
        assert_eq!(manager.state(), SurfaceState::NoWindow);
        assert!(manager.native_window().is_none());
        assert_eq!(dead.reference_count(), 1);

        context.fail_next_onscreen_surface();
        assert!(!manager.set_native_window(window(0x3000)));
        assert!(manager.set_native_window(window(0x3000)));
    }

    #[test]
    fn test_same_size_resize_is_noop() {
        let context = headless();
        let mut manager = manager(&context);
        assert!(manager.set_native_window(window(0x1000)));
        let binds = context.bind_count();

        assert!(manager.on_screen_surface_resize(SurfaceSize::new(1080, 1920)));
        assert_eq!(context.bind_count(), binds);
    }

    #[test]
    fn test_recreating_resize_makes_surface_current() {
        let context = headless();
        let mut manager = manager(&context);
        assert!(manager.set_native_window(window(0x1000)));

        assert!(manager.on_screen_surface_resize(SurfaceSize::new(800, 600)));
        let binding = context.current_binding().unwrap();
        assert_eq!(binding.kind, SurfaceKind::OnScreen);
        assert_eq!(binding.role, ContextRole::Render);
        assert_eq!(context.live_surfaces(SurfaceKind::OnScreen), 1);
    }

    #[test]
    fn test_failed_in_place_resize_keeps_surface() {
        let caps = ContextCapabilities::OFFSCREEN | ContextCapabilities::RESOURCE_CONTEXT | ContextCapabilities::RESIZE_IN_PLACE;
        let context = Arc::new(HeadlessContext::with_capabilities(ContextConfig::default(), caps));
        let mut manager = manager(&context);
        assert!(manager.set_native_window(window(0x1000)));

        assert!(manager.on_screen_surface_resize(SurfaceSize::new(800, 600)));
        context.fail_next_resize();
        assert!(!manager.on_screen_surface_resize(SurfaceSize::new(640, 480)));

        assert_eq!(manager.state(), SurfaceState::Bound);
        assert_eq!(manager.on_screen_size(), Some(SurfaceSize::new(800, 600)));
        assert!(manager.gl_context_make_current().succeeded());
    }

    #[test]
    fn test_failed_recreating_resize_drops_window() {
        let context = headless();
        let mut manager = manager(&context);
        let w1 = window(0x1000);
        assert!(manager.set_native_window(w1.clone()));

        context.fail_next_onscreen_surface();
        assert!(!manager.on_screen_surface_resize(SurfaceSize::new(800, 600)));

        assert_eq!(manager.state(), SurfaceState::NoWindow);
        assert!(manager.native_window().is_none());
        assert_eq!(w1.reference_count(), 1);
        assert_eq!(context.live_surfaces(SurfaceKind::OnScreen), 0);
    }

    #[test]
    fn test_finalize_failure_drops_frame() {
        let context = headless();
        let (mut manager, overlay) = with_shared_overlay(&context, CompositorConfig::enabled());
        assert!(manager.set_native_window(window(0x1000)));
        assert!(manager.gl_context_make_current().succeeded());

        let embedder = manager.external_view_embedder().unwrap();
        embedder.mark_used();
        overlay.fail_next_finalize();

        assert!(!manager.gl_context_present());
        assert_eq!(context.swap_count(), 0);

        assert!(manager.gl_context_present());
        assert_eq!(context.swap_count(), 1);
        assert_eq!(overlay.finalized_frames(), 1);
    }

    #[test]
    fn test_unused_compositor_is_not_finalized() {
        let context = headless();
        let (mut manager, overlay) = with_shared_overlay(&context, CompositorConfig::enabled());
        assert!(manager.set_native_window(window(0x1000)));
        assert!(manager.gl_context_make_current().succeeded());

        assert!(manager.external_view_embedder().is_some());
        assert!(manager.gl_context_present());
        assert_eq!(overlay.finalized_frames(), 0);
    }

    #[test]
    fn test_framebuffer_selection() {
        let context = headless();
        let config = CompositorConfig::enabled().with_intermediate_framebuffer(7);
        let (mut manager, overlay) = with_shared_overlay(&context, config);

        // No window: the off-screen surface's framebuffer
        let offscreen_fbo = manager.gl_context_fbo();
        assert!(!offscreen_fbo.is_default());
        assert_eq!(
            manager.gl_context_make_current(),
            GlContextResult::Current {
                target: SurfaceKind::OffScreen,
                already_current: false
            }
        );

        assert!(manager.set_native_window(window(0x1000)));
        assert_eq!(manager.gl_context_fbo(), FramebufferId::DEFAULT);

        manager.external_view_embedder().unwrap().mark_used();
        assert_eq!(manager.gl_context_fbo(), FramebufferId(7));

        // Teardown resets overlay state
        manager.teardown_on_screen_context();
        assert!(!overlay.is_used());
        assert_eq!(manager.gl_context_fbo(), offscreen_fbo);
    }

    #[test]
    fn test_resource_context_without_offscreen_surface() {
        let context = Arc::new(HeadlessContext::with_capabilities(
            ContextConfig::default(),
            ContextCapabilities::empty(),
        ));
        let mut manager = manager(&context);

        assert!(!manager.has_offscreen_surface());
        assert!(!manager.resource_context_make_current());
        assert!(!manager.resource_context_clear_current());
        assert_eq!(
            manager.gl_context_make_current(),
            GlContextResult::Failed(SurfaceError::NoSurface(SurfaceKind::OffScreen))
        );
        assert!(manager.set_native_window(window(0x1000)));
        assert!(manager.gl_context_make_current().succeeded());
    }

    #[test]
    fn test_dropping_manager_releases_everything() {
        let context = headless();
        let mut manager = manager(&context);
        let resource = manager.resource_context();
        assert!(manager.set_native_window(window(0x1000)));
        assert!(manager.gl_context_make_current().succeeded());

        drop(manager);

        assert!(context.current_binding().is_none());
        assert_eq!(context.live_surfaces(SurfaceKind::OnScreen), 0);
        assert_eq!(context.live_surfaces(SurfaceKind::OffScreen), 0);
        assert!(!resource.make_current());
    }

    #[test]
    fn test_mailbox_messages_drive_manager() {
        let context = headless();
        let mut manager = manager(&context);
        let mailbox = WindowMailbox::new();
        let sender = mailbox.sender();
        let w1 = window(0x1000);

        sender.post(WindowMessage::Attach(w1.clone()));
        sender.post(WindowMessage::Resize(SurfaceSize::new(800, 600)));
        assert!(manager.apply(mailbox.take().unwrap()));
        assert_eq!(manager.on_screen_size(), Some(SurfaceSize::new(800, 600)));

        sender.post(WindowMessage::Resize(SurfaceSize::new(600, 800)));
        assert!(manager.apply(mailbox.take().unwrap()));
        assert_eq!(w1.size(), SurfaceSize::new(600, 800));

        sender.post(WindowMessage::Teardown);
        assert!(manager.apply(mailbox.take().unwrap()));
        assert_eq!(manager.state(), SurfaceState::NoWindow);
    }

    #[test]
    fn test_gpu_surface_frames() {
        let context = headless();
        let mut manager = manager(&context);
        let backend = Arc::new(NullBackendContext::new());
        let mut surface = manager.create_gpu_surface(backend.clone()).unwrap();

        // Without a window frames go to the off-screen surface and are not presented
        let frame = surface.acquire_frame(SurfaceSize::new(1, 1)).unwrap();
        assert!(!frame.target().framebuffer.is_default());
        assert!(!frame.submit());

        assert!(manager.set_native_window(window(0x1000)));
        let size = SurfaceSize::new(1080, 1920);
        for _ in 0..3 {
            let frame = surface.acquire_frame(size).unwrap();
            assert_eq!(frame.target().framebuffer, FramebufferId::DEFAULT);
            assert!(frame.submit());
        }

        assert_eq!(context.swap_count(), 3);
        assert_eq!(backend.resets(), 2);
        assert_eq!(backend.flushes(), 4);
    }
}
