mod tray;
