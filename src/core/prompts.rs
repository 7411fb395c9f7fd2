//! 发送给大模型的固定提示词.

/// SQL 合成的系统指令, 用户问题作为独立的用户消息发送
pub const SQL_SYSTEM_PROMPT: &str = r#"You convert English questions into a single SQL statement.
The SQL database has three tables: "restaurant", "menu" and "reviews".

restaurant:
- restaurant_id (bigint)
- restaurant_name (text)
- cuisine (text)
- city (text)
- state (text)
- address (text)
- latitude (float)
- longitude (float)
- phone_number (text)
- email (text)
- delivery_available (text)
- seating_capacity (int)
- opening_hours (text)
- has_wifi (text)
- has_outdoor_seating (text)
- payment_methods (text)
- parking_available (text)
- alcohol_served (text)
- reservation_required (text)
- music_type (text)
- health_rating (int)
- has_kids_menu (text)

menu:
- restaurant_id (bigint)
- item_name (text)
- price_usd (float)
- is_vegetarian (bool)
- image_url (text)

reviews:
- restaurant_id (bigint)
- rating (float)
- review_count (int)
- sample_review (text)
- tags (text)

Example questions:
give me top 5 restaurants having google pay
give me 5 restaurant names in NY
top 5 restaurants in Florida
restaurants having outdoor seating
restaurants having health rate more than 90 with vegetarian menu
give me timings for the Adams-White Kitchen restaurant

Example statements:
SELECT * FROM restaurant WHERE city = 'Los Angeles' AND health_rating > 90;
SELECT item_name, price_usd FROM menu WHERE is_vegetarian = 'TRUE' AND price_usd < 10;
SELECT r.restaurant_name, AVG(v.rating) FROM restaurant r JOIN reviews v ON r.restaurant_id = v.restaurant_id GROUP BY r.restaurant_name;
SELECT r.restaurant_name, m.item_name, m.price_usd FROM restaurant r JOIN menu m ON r.restaurant_id = m.restaurant_id;
SELECT r.restaurant_name FROM restaurant r JOIN reviews v ON r.restaurant_id = v.restaurant_id WHERE v.tags LIKE '%romantic%' ORDER BY v.rating DESC LIMIT 5;
SELECT r.restaurant_name FROM restaurant r JOIN menu m ON r.restaurant_id = m.restaurant_id JOIN reviews v ON r.restaurant_id = v.restaurant_id WHERE r.health_rating > 90 AND m.is_vegetarian = 'TRUE' GROUP BY r.restaurant_name ORDER BY AVG(v.rating) DESC LIMIT 3;
SELECT restaurant_name FROM restaurant WHERE state = 'Florida' LIMIT 5;

Data modification is allowed:
INSERT INTO restaurant (...) VALUES (...);
UPDATE restaurant SET health_rating = 99 WHERE restaurant_id = ...;
DELETE FROM reviews WHERE restaurant_id = ...;

Boolean-like features (outdoor seating, wifi, kids menu, alcohol served, vegetarian, ...) are stored as text.
Compare them with quoted strings such as 'yes', 'no' or 'TRUE', never with native booleans.
Correct:   SELECT * FROM menu WHERE is_vegetarian = 'TRUE';
Incorrect: SELECT * FROM menu WHERE is_vegetarian = TRUE;

Only answer questions about the restaurant, menu and reviews tables.
Return only the SQL statement: no markdown fences, no leading "SQL", no explanation."#;

const DOCUMENT_PROMPT_HEAD: &str = r#"You convert user questions into MongoDB queries.
Return only JSON, with no other text.

There are three output formats.

1. READ (find, list, count, get): an aggregation pipeline as a JSON ARRAY.
[
  { "$match": { ... } },
  { "$project": { ... } }
]

2. MODIFY (insert, update, delete): a JSON OBJECT with an "operation" field.
Supported operations are exactly "insertOne", "updateOne" and "deleteOne".
{
  "operation": "insertOne" | "updateOne" | "deleteOne",
  "collection": "listing" | "review" | "host",   // optional, defaults to listing
  "filter": { ... },     // updateOne, deleteOne
  "update": { ... },     // updateOne
  "document": { ... }    // insertOne
}

3. LOOKUP (data spanning collections): an aggregation pipeline ARRAY with $lookup stages.
Pipelines always start from the listing collection.
[
  { "$match": { ... } },
  { "$lookup": { "from": "host", "localField": "host_id", "foreignField": "host_id", "as": "host_info" } },
  { "$project": { ... } }
]

Schema. The database has three collections: listing, review and host.

listing: housing listings for rent or sale
- _id (ObjectId), id (numeric primary key), category (e.g. "housing/rent/apartment"), title, body,
  amenities, bathrooms, bedrooms, currency (e.g. "USD"), picture_url, fee ("Yes"/"No"),
  has_photo (e.g. "Thumbnail"), pets_allowed (e.g. "Cats,Dogs"), price (numeric),
  price_display (e.g. "$2,395"), price_type (e.g. "Monthly"), square_feet,
  host_id (foreign key to host.host_id), address, cityname, state, latitude, longitude,
  source (e.g. "RentLingo"), time, description, neighborhood_overview

review: reviews of listings
- _id (ObjectId), id (foreign key to listing.id), number_of_reviews, last_review,
  first_review, review_scores

host: hosts and landlords
- _id (ObjectId), host_id (primary key, referenced by listing.host_id), host_name,
  host_since, host_response_time, host_about

Relations:
- listing.host_id joins host.host_id
- listing.id joins review.id

Guidelines:
- Delete ("delete", "remove", "take down"): {"operation": "deleteOne", "filter": {...}}.
  Include both cityname and state in the filter when both are given; only cityname when only a city is named.
- Update ("update", "change", "modify"): {"operation": "updateOne", "filter": {...}, "update": {"$set": {...}}}.
- Insert ("add", "create", "insert"): {"operation": "insertOne", "document": {...}}.
- Reads always include a $project stage to limit fields.
- Include picture_url in projections only when the user explicitly asks for images.

Sample questions and queries:
"#;

pub fn document_prompt(question: &str, sample_hints: &str) -> String {
    format!(
        "{}{}\n\nReturn only the JSON query for this question.\nUser question: {}",
        DOCUMENT_PROMPT_HEAD, sample_hints, question
    )
}

/// 两组关键词同时命中时使用
pub fn both_matched_prompt(question: &str) -> String {
    format!(
        "The user asked: \"{}\"\n\n\
         Decide which database answers this: SQL (restaurant, menu and reviews data) \
         or MongoDB (housing listings, hosts and listing reviews).\n\
         Reply with exactly one word: SQL or MongoDB.",
        question
    )
}

/// 两组关键词都未命中时使用
pub fn none_matched_prompt(question: &str) -> String {
    format!(
        "Decide whether the following question should be handled with SQL (relational data) \
         or MongoDB (NoSQL documents).\n\
         Reply with one word: SQL or MongoDB.\n\n\
         Question: {}",
        question
    )
}

pub fn summary_prompt(question: &str, flattened: &str, lookup: bool) -> String {
    let mut prompt = format!(
        "You are a helpful assistant.\n\
         User question: {}\n\n\
         Query results:\n{}\n\n\
         Based on the above, answer the user's question clearly in plain English. \
         If this was an insert, update or delete, explain what changed in the database.",
        question, flattened
    );
    if !lookup {
        prompt.push_str(" Do not mention joins or lookup operations.");
    }
    prompt
}
