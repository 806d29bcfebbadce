//! 内置示例文档，网络不可用时兜底

use crate::types::{DocumentMetadata, SourceDocument};

const REACT_USE_HOOK: &str = r#"# React 18+ Modern Patterns

## Using the `use` Hook

The `use` hook is a new React hook for handling asynchronous operations in Server Components.

**Important**: The `use` hook is designed for Server Components, not Client Components.

For Client Components, continue using:
- `useEffect` with `fetch`
- Data fetching libraries like SWR or React Query
- `useSWR` for simple cases

Example for Client Component:
```jsx
import useSWR from 'swr'

function Profile() {
  const { data, error } = useSWR('/api/user', fetch)

  if (error) return <div>Failed to load</div>
  if (!data) return <div>Loading...</div>

  return <div>Hello {data.name}!</div>
}
```
"#;

const NEXTJS_APP_ROUTER: &str = r#"# Next.js 15 App Router

## Client vs Server Components

Server Components run on the server and can directly access databases.
Client Components run in the browser and need to fetch data through APIs.

For data fetching in Client Components:
1. Use `fetch` with `useEffect`
2. Use SWR for caching: `npm install swr`
3. Use React Query for complex state management

Example with SWR:
```jsx
'use client'
import useSWR from 'swr'

const fetcher = (url) => fetch(url).then(res => res.json())

export default function Posts() {
  const { data, error, isLoading } = useSWR('/api/posts', fetcher)

  if (error) return <div>Failed to load posts</div>
  if (isLoading) return <div>Loading...</div>

  return (
    <ul>
      {data.map(post => (
        <li key={post.id}>{post.title}</li>
      ))}
    </ul>
  )
}
```
"#;

const OPENAI_STREAMING: &str = r#"# OpenAI SDK v4+ Streaming

## New Streaming API

The OpenAI SDK v4 introduced a new streaming API.

```javascript
import OpenAI from 'openai'

const openai = new OpenAI({
  apiKey: process.env.OPENAI_API_KEY,
})

const stream = await openai.chat.completions.create({
  model: 'gpt-4',
  messages: [{ role: 'user', content: 'Hello!' }],
  stream: true,
})

for await (const chunk of stream) {
  process.stdout.write(chunk.choices[0]?.delta?.content || '')
}
```

## React Integration

```jsx
import { useState } from 'react'

function ChatComponent() {
  const [response, setResponse] = useState('')

  const handleStream = async () => {
    const response = await fetch('/api/chat', {
      method: 'POST',
      body: JSON.stringify({ message: 'Hello' })
    })

    const reader = response.body.getReader()
    const decoder = new TextDecoder()

    while (true) {
      const { done, value } = await reader.read()
      if (done) break

      const chunk = decoder.decode(value)
      setResponse(prev => prev + chunk)
    }
  }

  return (
    <div>
      <button onClick={handleStream}>Start Chat</button>
      <div>{response}</div>
    </div>
  )
}
```
"#;

const COMMON_MISTAKES: &str = r#"# Common React Mistakes in 2024

## Outdated Patterns to Avoid

### 1. Using `use` hook in Client Components
**Wrong:**
```jsx
'use client'
import { use } from 'react'

function UserProfile() {
  const user = use(fetchUser()) // This will NOT work in Client Components
  return <div>{user.name}</div>
}
```

**Correct:**
```jsx
'use client'
import { useState, useEffect } from 'react'

function UserProfile() {
  const [user, setUser] = useState(null)

  useEffect(() => {
    fetchUser().then(setUser)
  }, [])

  if (!user) return <div>Loading...</div>
  return <div>{user.name}</div>
}
```

### 2. Old React 17 Patterns
Avoid using class components for new code. Use function components with hooks.

### 3. Deprecated Next.js Patterns
Don't use `getServerSideProps` in App Router. Use Server Components instead.
"#;

/// 四篇示例文档：React use hook、Next.js 15、OpenAI SDK v4 流式输出、React常见错误
pub fn sample_documents() -> Vec<SourceDocument> {
    let sample = |content: &str, source: &str, doc_type: &str, framework: &str| {
        let mut metadata = DocumentMetadata::new(source, doc_type);
        metadata.framework = Some(framework.to_string());
        SourceDocument::new(content.trim(), metadata)
    };

    vec![
        sample(REACT_USE_HOOK, "React 18 Official Docs", "documentation", "react"),
        sample(NEXTJS_APP_ROUTER, "Next.js 15 Documentation", "documentation", "nextjs"),
        sample(OPENAI_STREAMING, "OpenAI SDK v4 Docs", "documentation", "openai"),
        sample(COMMON_MISTAKES, "React Best Practices 2024", "best_practices", "react"),
    ]
}
