use super::*;

#[test]
fn ascii_written_via_vte_ends_up_in_the_vt_grid() {
    let mut terminal = Terminal::new(20, 5).expect("create terminal");
    terminal.bench_write_to_term(b"hi");
    terminal.bench_sync_grid();

    terminal.with_vt(|vt| {
        assert_eq!(vt.cols, 20);
        assert_eq!(vt.rows, 5);
        assert_eq!(vt.grid[0][0].ch, 'h');
        assert_eq!(vt.grid[0][1].ch, 'i');
    });
}

#[test]
fn resize_updates_reported_dimensions() {
    let mut terminal = Terminal::new(80, 24).expect("create terminal");
    terminal.resize(100, 30);
    assert_eq!(terminal.current_cols(), 100);
    assert_eq!(terminal.current_rows(), 30);
}

#[test]
fn resize_is_clamped_to_sane_maximums() {
    let mut terminal = Terminal::new(80, 24).expect("create terminal");
    terminal.resize(u16::MAX, u16::MAX);
    assert!(terminal.current_cols() <= 1000);
    assert!(terminal.current_rows() <= 500);
}

#[test]
fn freshly_created_terminal_is_not_done() {
    let terminal = Terminal::new(80, 24).expect("create terminal");
    assert!(!terminal.is_done());
}

#[test]
fn search_buffer_finds_a_written_substring() {
    let mut terminal = Terminal::new(40, 5).expect("create terminal");
    terminal.bench_write_to_term(b"the quick brown fox\r\n");
    let hits = terminal.search_buffer("quick");
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].1, 4);
    assert_eq!(hits[0].2, 5);
}

#[test]
fn search_buffer_is_case_insensitive_and_empty_query_finds_nothing() {
    let mut terminal = Terminal::new(40, 5).expect("create terminal");
    terminal.bench_write_to_term(b"HELLO world\r\n");
    assert_eq!(terminal.search_buffer("hello").len(), 1);
    assert!(terminal.search_buffer("").is_empty());
}

#[test]
fn term_mode_maps_bracketed_paste_and_alt_screen() {
    let mut mode = TermMode::empty();
    mode.insert(TermMode::BRACKETED_PASTE);
    mode.insert(TermMode::ALT_SCREEN);
    let vt_mode = term_mode_to_vt_mode(mode);
    assert!(vt_mode.contains(VtMode::BRACKETED_PASTE));
    assert!(vt_mode.contains(VtMode::ALT_SCREEN));
    assert!(!vt_mode.contains(VtMode::MOUSE_SGR));
}

#[test]
fn hidden_cursor_mode_is_reported_when_show_cursor_is_unset() {
    let mode = TermMode::empty();
    let vt_mode = term_mode_to_vt_mode(mode);
    assert!(vt_mode.contains(VtMode::HIDE_CURSOR));
}

#[test]
fn indexed_color_0_to_15_matches_named_ansi_palette() {
    let palette = [None; 256];
    let red_named = color::convert_color(&AnsiColor::Named(NamedColor::Red), &palette);
    let red_indexed = color::convert_color(&AnsiColor::Indexed(1), &palette);
    assert_eq!(red_named, red_indexed);
}

#[test]
fn truecolor_spec_passes_through_unchanged() {
    let palette = [None; 256];
    let spec = AnsiColor::Spec(AnsiRgb { r: 10, g: 20, b: 30 });
    let color = color::convert_color(&spec, &palette);
    assert_eq!(color, Color::rgb(10, 20, 30));
}
