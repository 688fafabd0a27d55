mod ui_rendering;
