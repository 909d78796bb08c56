pub const SCHEMA: &str = r#"
-- Images: one row per uploaded file
CREATE TABLE IF NOT EXISTS images (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    title TEXT NOT NULL,
    filename TEXT NOT NULL,        -- <millis>-<sanitised name>, relative to the upload dir
    description TEXT,
    likes INTEGER DEFAULT 0,       -- denormalised COUNT(likes) for this image
    uploaded_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
);

-- Admins: seeded at startup, never created through the API
CREATE TABLE IF NOT EXISTS admins (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    username TEXT UNIQUE NOT NULL,
    password TEXT NOT NULL,        -- argon2id PHC string
    email TEXT NOT NULL,
    created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
);

-- Likes: at most one per (image, email)
CREATE TABLE IF NOT EXISTS likes (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    image_id INTEGER,
    email TEXT,                    -- normalised (trimmed, lowercase)
    liked_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
    FOREIGN KEY(image_id) REFERENCES images(id),
    UNIQUE(image_id, email)
);

-- Comments: unbounded per image, only the latest 20 are served
CREATE TABLE IF NOT EXISTS comments (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    image_id INTEGER,
    email TEXT NOT NULL,
    text TEXT NOT NULL,
    created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
    FOREIGN KEY(image_id) REFERENCES images(id)
);

-- Upload allow-list
CREATE TABLE IF NOT EXISTS upload_permissions (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    email TEXT UNIQUE NOT NULL,
    created_by TEXT,               -- admin username, no FK
    created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
);
"#;

/// Applied after `SCHEMA` on every start. Each statement must be idempotent;
/// failures are ignored so databases created by older builds keep working.
pub const MIGRATIONS: &[&str] = &[
    "CREATE INDEX IF NOT EXISTS idx_likes_image ON likes(image_id)",
    "CREATE INDEX IF NOT EXISTS idx_comments_image_created ON comments(image_id, created_at)",
    "CREATE INDEX IF NOT EXISTS idx_images_uploaded_at ON images(uploaded_at)",
];
