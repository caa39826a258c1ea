use tui_textarea::Input;

pub enum Event {
    KeyboardCharInput(Input),
    KeyboardCTRLC(),
    KeyboardCTRLR(),
    KeyboardEnter(),
    KeyboardPaste(String),
    KeyboardTab(),
    StoreChanged(),
    UIScrollDown(),
    UIScrollUp(),
    UIScrollPageDown(),
    UIScrollPageUp(),
    UITick(),
}
