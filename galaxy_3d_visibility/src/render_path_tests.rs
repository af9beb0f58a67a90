use super::*;

#[test]
fn test_forward_path_layout() {
    let path = RenderPath::forward();
    let kinds: Vec<_> = path.commands().iter().map(|command| command.kind).collect();
    assert_eq!(
        kinds,
        vec![
            RenderCommandKind::Clear,
            RenderCommandKind::ScenePass,
            RenderCommandKind::ForwardLights,
            RenderCommandKind::ScenePass,
            RenderCommandKind::ScenePass,
            RenderCommandKind::ScenePass,
        ]
    );

    let base = &path.commands()[1];
    assert_eq!(base.pass, "base");
    assert!(base.vertex_lights);
    assert_eq!(base.metadata, "base");

    let lights = &path.commands()[2];
    assert_eq!(lights.pass, "light");
    assert!(lights.use_lit_base);

    let alpha = &path.commands()[4];
    assert_eq!(alpha.sort_mode, SortMode::BackToFront);
    assert_eq!(alpha.outputs, vec![VIEWPORT_OUTPUT.to_string()]);
}

#[test]
fn test_tagged_commands_can_be_disabled() {
    let mut path = RenderPath::forward();
    path.add_command(RenderPathCommand::quad("Blur", "Blur").with_tag("Blur"));
    path.add_command(RenderPathCommand::quad("Bloom", "Bloom").with_tag("bloom"));
    path.set_enabled("BLUR", false);

    assert_eq!(path.commands().len(), 8);
    assert_eq!(path.enabled_commands().count(), 7);
    assert!(path.enabled_commands().all(|command| command.tag != "Blur"));
}

#[test]
fn test_insert_and_remove() {
    let mut path = RenderPath::new();
    path.add_command(RenderPathCommand::scene_pass("base", SortMode::FrontToBack));
    path.insert_command(0, RenderPathCommand::shadow_maps());
    path.insert_command(99, RenderPathCommand::forward_lights("light").with_use_lit_base(false));

    assert_eq!(path.commands()[0].kind, RenderCommandKind::ShadowMaps);
    assert!(!path.commands()[2].use_lit_base);
    assert!(path.remove_command(5).is_none());
    assert_eq!(path.remove_command(0).unwrap().kind, RenderCommandKind::ShadowMaps);
    assert_eq!(path.commands().len(), 2);
}
