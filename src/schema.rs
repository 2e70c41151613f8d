table! {
    users (id) {
        id -> Int4,
        username -> Varchar,
        password -> Varchar,
    }
}

table! {
    blog_posts (id) {
        id -> Int4,
        author_id -> Int4,
        title -> Varchar,
        content -> Text,
        created_at -> Timestamp,
        updated_at -> Timestamp,
    }
}

table! {
    likes (id) {
        id -> Int4,
        user_id -> Int4,
        blog_post_id -> Int4,
        liked_at -> Timestamp,
    }
}

table! {
    comments (id) {
        id -> Int4,
        user_id -> Int4,
        blog_post_id -> Int4,
        content -> Text,
        created_at -> Timestamp,
    }
}

joinable!(blog_posts -> users (author_id));
joinable!(comments -> users (user_id));
joinable!(comments -> blog_posts (blog_post_id));
joinable!(likes -> users (user_id));
joinable!(likes -> blog_posts (blog_post_id));

allow_tables_to_appear_in_same_query!(
    blog_posts,
    comments,
    likes,
    users,
);
